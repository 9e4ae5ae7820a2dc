//! Command-to-handler dispatch table.

use crate::Message;

/// The state handler a message is routed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Handler {
    Welcome,
    Isupport,
    Unaway,
    NowAway,
    Names,
    NoTopic,
    TopicContent,
    TopicWhoTime,
    Join,
    Part,
    Kick,
    Quit,
    Nick,
    Mode,
    Topic,
    Ping,
    /// No state change; observers still see the message.
    Unhandled,
}

impl Handler {
    /// Select the handler for `msg` by command or numeric.
    pub fn for_message(msg: &Message) -> Handler {
        match msg.command.to_ascii_uppercase().as_str() {
            "001" => Handler::Welcome,
            "005" => Handler::Isupport,
            "305" => Handler::Unaway,
            "306" => Handler::NowAway,
            "353" => Handler::Names,
            "331" => Handler::NoTopic,
            "332" => Handler::TopicContent,
            "333" => Handler::TopicWhoTime,
            "JOIN" => Handler::Join,
            "PART" => Handler::Part,
            "KICK" => Handler::Kick,
            "QUIT" => Handler::Quit,
            "NICK" => Handler::Nick,
            "MODE" => Handler::Mode,
            "TOPIC" => Handler::Topic,
            "PING" => Handler::Ping,
            _ => Handler::Unhandled,
        }
    }
}
