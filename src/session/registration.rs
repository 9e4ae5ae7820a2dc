//! Downstream registration handshake.
//!
//! Runs before a session is attached: answers `PING` and `CAP`, collects
//! `PASS`, `NICK` and `USER`, and checks the server password.

use crate::prefix::Prefix;
use crate::response::Response;
use crate::Message;

/// Identity supplied by a session that finished registering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Registered {
    pub nick: String,
    /// USER name, possibly `name@bouncer`.
    pub user: String,
    pub real: String,
}

/// Outcome of feeding one message to a [`Registration`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistrationStep {
    /// Still registering; send these replies.
    Continue(Vec<Message>),
    /// Registration finished.
    Complete(Registered),
    /// Send these replies, then close the connection.
    Reject(Vec<Message>, String),
}

/// Sans-IO registration state for one downstream connection.
#[derive(Clone, Debug)]
pub struct Registration {
    server_name: String,
    password: Option<String>,
    pass: Option<String>,
    nick: Option<String>,
    user: Option<(String, String)>,
}

impl Registration {
    pub fn new(server_name: &str, password: Option<&str>) -> Self {
        Registration {
            server_name: server_name.to_owned(),
            password: password.map(str::to_owned),
            pass: None,
            nick: None,
            user: None,
        }
    }

    fn reply<I, P>(&self, command: &str, params: I) -> Message
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Message::new(command, params).with_prefix(Prefix::ServerName(self.server_name.clone()))
    }

    pub fn feed(&mut self, msg: &Message) -> RegistrationStep {
        let mut replies = Vec::new();

        match msg.command.to_ascii_uppercase().as_str() {
            "PING" => {
                let token = msg.param(0).unwrap_or(&self.server_name).to_owned();
                replies.push(self.reply("PONG", [self.server_name.clone(), token]));
            }
            "CAP" => match msg.param(0).map(str::to_ascii_uppercase).as_deref() {
                Some("LS") | Some("LIST") => {
                    let sub = msg.param(0).unwrap_or("LS").to_ascii_uppercase();
                    replies.push(self.reply("CAP", ["*", sub.as_str(), ""]));
                }
                Some("REQ") => {
                    let caps = msg.param(1).unwrap_or("");
                    replies.push(self.reply("CAP", ["*", "NAK", caps]));
                }
                _ => {}
            },
            "PASS" => self.pass = msg.param(0).map(str::to_owned),
            "NICK" => {
                if let Some(nick) = msg.param(0) {
                    self.nick = Some(nick.to_owned());
                }
            }
            "USER" => {
                if let Some(user) = msg.param(0) {
                    let real = msg.param(3).unwrap_or(user);
                    self.user = Some((user.to_owned(), real.to_owned()));
                }
            }
            _ => {}
        }

        match (&self.nick, &self.user) {
            (Some(nick), Some((user, real))) => {
                if let Some(password) = &self.password {
                    if self.pass.as_deref() != Some(password.as_str()) {
                        replies.push(Response::err_passwdmismatch(&self.server_name, nick));
                        return RegistrationStep::Reject(replies, "Password incorrect".into());
                    }
                }
                RegistrationStep::Complete(Registered {
                    nick: nick.clone(),
                    user: user.clone(),
                    real: real.clone(),
                })
            }
            _ => RegistrationStep::Continue(replies),
        }
    }
}
