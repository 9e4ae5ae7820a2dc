//! IRC message prefix types.
//!
//! A prefix identifies the origin of a message: either a server name or a
//! user's `nick!user@host` mask.

use std::str::FromStr;

/// IRC message prefix - identifies the origin of a message.
///
/// A prefix without `!` and without `@` is a server name; anything else is
/// a user mask. A user or host part is `Some` whenever its separator was
/// present, even if the part itself is empty.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum Prefix {
    /// Server name (e.g., "irc.example.com")
    ServerName(String),
    /// User prefix: (nickname, username, hostname)
    Nickname(String, Option<String>, Option<String>),
}

impl Prefix {
    /// Parse a prefix string into a Prefix.
    ///
    /// This is a lenient parser that does not validate the components.
    pub fn new_from_str(s: &str) -> Self {
        if !s.contains(['!', '@']) {
            return Prefix::ServerName(s.to_owned());
        }

        let (rest, host) = match s.rsplit_once('@') {
            Some((rest, host)) => (rest, Some(host.to_owned())),
            None => (s, None),
        };
        let (nick, user) = match rest.split_once('!') {
            Some((nick, user)) => (nick, Some(user.to_owned())),
            None => (rest, None),
        };

        Prefix::Nickname(nick.to_owned(), user, host)
    }

    /// Create a new user prefix from nick, user, and host components.
    ///
    /// # Example
    ///
    /// ```
    /// use slirc_bouncer::Prefix;
    ///
    /// let prefix = Prefix::new("nick", "user", "host.example.com");
    /// assert_eq!(prefix.nick(), Some("nick"));
    /// assert_eq!(prefix.user(), Some("user"));
    /// assert_eq!(prefix.host(), Some("host.example.com"));
    /// ```
    pub fn new(nick: impl Into<String>, user: impl Into<String>, host: impl Into<String>) -> Self {
        Prefix::Nickname(nick.into(), Some(user.into()), Some(host.into()))
    }

    /// The leading name of the prefix.
    ///
    /// For user masks this is the nickname; a bare server-style prefix is
    /// also reported here, since some servers send bare nicks as sources.
    pub fn nick(&self) -> Option<&str> {
        match self {
            Prefix::ServerName(name) if !name.is_empty() => Some(name),
            Prefix::Nickname(nick, _, _) if !nick.is_empty() => Some(nick),
            _ => None,
        }
    }

    /// Get the username if this is a user prefix.
    pub fn user(&self) -> Option<&str> {
        match self {
            Prefix::Nickname(_, Some(user), _) if !user.is_empty() => Some(user),
            _ => None,
        }
    }

    /// Get the hostname if this is a user prefix.
    pub fn host(&self) -> Option<&str> {
        match self {
            Prefix::Nickname(_, _, Some(host)) if !host.is_empty() => Some(host),
            _ => None,
        }
    }

    /// Get the server name if this prefix carries neither `!` nor `@`.
    pub fn server(&self) -> Option<&str> {
        match self {
            Prefix::ServerName(name) => Some(name),
            Prefix::Nickname(..) => None,
        }
    }
}

impl FromStr for Prefix {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Prefix::new_from_str(s))
    }
}

impl From<&str> for Prefix {
    fn from(s: &str) -> Self {
        Prefix::new_from_str(s)
    }
}
