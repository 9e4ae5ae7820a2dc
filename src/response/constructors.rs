//! Reply constructors for `Response`.

use crate::message::Message;
use crate::prefix::Prefix;
use crate::response::Response;

impl Response {
    /// Build this numeric as sent by `server`.
    pub fn reply<I, P>(self, server: &str, params: I) -> Message
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Message::new(self.to_string(), params).with_prefix(Prefix::ServerName(server.to_owned()))
    }

    /// `464 ERR_PASSWDMISMATCH`
    /// `<client> :Password incorrect`
    pub fn err_passwdmismatch(server: &str, client: &str) -> Message {
        Response::ERR_PASSWDMISMATCH.reply(server, [client, "Password incorrect"])
    }

    /// `366 RPL_ENDOFNAMES`
    /// `<client> <channel> :End of /NAMES list`
    pub fn rpl_endofnames(server: &str, client: &str, channel: &str) -> Message {
        Response::RPL_ENDOFNAMES.reply(server, [client, channel, "End of /NAMES list"])
    }

    /// `331 RPL_NOTOPIC`
    /// `<client> <channel> :No topic is set`
    pub fn rpl_notopic(server: &str, client: &str, channel: &str) -> Message {
        Response::RPL_NOTOPIC.reply(server, [client, channel, "No topic is set"])
    }
}
