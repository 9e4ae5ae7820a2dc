use std::str::FromStr;

use encoding::Encoding;

use super::nom_parser::ParsedMessage;
use crate::error::MessageParseError;
use crate::line::{decode_line, encode_line};
use crate::prefix::Prefix;

/// An owned IRC message.
///
/// The source fields (`nick`, `user`, `host`, `server`) are derived from the
/// prefix on demand rather than stored.
///
/// # Example
///
/// ```
/// use slirc_bouncer::Message;
///
/// let msg: Message = ":nick!user@host PRIVMSG #channel :Hello!".parse().unwrap();
/// assert_eq!(msg.nick(), Some("nick"));
///
/// let msg = Message::new("PRIVMSG", ["#channel", "hi"]);
/// assert_eq!(msg.to_string(), "PRIVMSG #channel :hi\r\n");
/// ```
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Message {
    /// Message prefix/source (e.g., `nick!user@host`).
    pub prefix: Option<Prefix>,
    /// The verb or three-digit numeric, as received.
    pub command: String,
    /// Parameters in order; the last may contain spaces.
    pub params: Vec<String>,
}

impl Message {
    /// Create a prefix-less message from a command and its parameters.
    #[must_use]
    pub fn new<C, I, P>(command: C, params: I) -> Self
    where
        C: Into<String>,
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Message {
            prefix: None,
            command: command.into(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    /// Set the prefix/source of this message.
    #[must_use]
    pub fn with_prefix(mut self, prefix: Prefix) -> Self {
        self.prefix = Some(prefix);
        self
    }

    /// Parse one raw line, with or without its terminator.
    pub fn parse(raw: &str) -> Result<Message, MessageParseError> {
        if raw.trim().is_empty() {
            return Err(MessageParseError::EmptyMessage);
        }

        let parsed = ParsedMessage::parse(raw).map_err(|_| MessageParseError::InvalidCommand)?;
        Ok(Message {
            prefix: parsed.prefix.map(Prefix::new_from_str),
            command: parsed.command.to_owned(),
            params: parsed.params.into_iter().map(str::to_owned).collect(),
        })
    }

    /// Decode raw bytes in the given character set and parse them.
    ///
    /// Bytes that are not valid in `encoding` are decoded as lossy UTF-8.
    pub fn decode(
        raw: &[u8],
        encoding: Option<&'static Encoding>,
    ) -> Result<Message, MessageParseError> {
        Message::parse(&decode_line(raw, encoding))
    }

    /// Serialize to wire form, terminator included, in the given character set.
    ///
    /// Text that cannot be represented in `encoding` is sent as UTF-8.
    pub fn encode(&self, encoding: Option<&'static Encoding>) -> Vec<u8> {
        encode_line(&self.to_string(), encoding)
    }

    /// The nickname from a `nick!user@host` prefix.
    pub fn nick(&self) -> Option<&str> {
        match self.prefix {
            Some(Prefix::Nickname(ref nick, _, _)) => Some(nick),
            _ => None,
        }
    }

    /// The username from a `nick!user@host` prefix.
    pub fn user(&self) -> Option<&str> {
        self.prefix.as_ref().and_then(Prefix::user)
    }

    /// The hostname from a `nick!user@host` prefix.
    pub fn host(&self) -> Option<&str> {
        self.prefix.as_ref().and_then(Prefix::host)
    }

    /// The server name when the prefix has neither `!` nor `@`.
    pub fn server(&self) -> Option<&str> {
        self.prefix.as_ref().and_then(Prefix::server)
    }

    /// Parameter `index`, if present.
    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    /// The three-digit numeric code, if the command is one.
    pub fn numeric(&self) -> Option<u16> {
        if self.command.len() == 3 && self.command.bytes().all(|b| b.is_ascii_digit()) {
            self.command.parse().ok()
        } else {
            None
        }
    }

    /// Case-insensitive command comparison.
    pub fn is_command(&self, command: &str) -> bool {
        self.command.eq_ignore_ascii_case(command)
    }
}

impl FromStr for Message {
    type Err = MessageParseError;

    fn from_str(s: &str) -> Result<Message, Self::Err> {
        Message::parse(s)
    }
}
