//! # slirc-bouncer
//!
//! An IRC bouncer: one persistent upstream connection per network, shared
//! by any number of attached clients.
//!
//! ## Features
//!
//! - IRC message parsing and serialization
//! - Line codec with CRLF reassembly and wire charset conversion
//! - Sans-IO tracking of channels, members, topics and modes
//! - Upstream connections over plain TCP or TLS with a configurable trust policy
//! - Attach resynchronization and session relay
//! - Optional modules: NickServ identification, user modes, scrollback
//!
//! ## Quick Start
//!
//! ### Parsing and serializing messages
//!
//! ```rust
//! use slirc_bouncer::{Message, Prefix};
//!
//! let msg: Message = ":nick!user@host PRIVMSG #channel :Hello!".parse().unwrap();
//! assert_eq!(msg.prefix, Some(Prefix::new("nick", "user", "host")));
//! assert_eq!(msg.params, vec!["#channel", "Hello!"]);
//!
//! // PRIVMSG text is always sent as a trailing parameter.
//! let reply = Message::new("PRIVMSG", ["#channel", "hi"]);
//! assert_eq!(reply.to_string(), "PRIVMSG #channel :hi\r\n");
//! ```
//!
//! ### Running a bouncer
//!
//! ```no_run
//! use std::sync::Arc;
//! use slirc_bouncer::bouncer::Bouncer;
//! use slirc_bouncer::client::{Client, ClientConfig};
//! use slirc_bouncer::config::Config;
//! use slirc_bouncer::server::{Gateway, Server};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::load("bouncer.toml")?;
//! let server = Arc::new(Server::new());
//!
//! let client = Client::new(ClientConfig::new("libera", "irc.libera.chat", 6667, "alice"));
//! server.add_bouncer(Bouncer::new("libera", client.clone()));
//! client.connect().await?;
//!
//! Gateway::bind(&config.listen, &config.server, server).await?.run().await
//! # }
//! ```

#![deny(clippy::all)]

pub mod bouncer;
pub mod casemap;
pub mod client;
pub mod config;
pub mod error;
pub mod irc;
pub mod isupport;
pub mod line;
pub mod message;
pub mod mode;
pub mod modules;
pub mod prefix;
pub mod response;
pub mod server;
pub mod session;
pub mod state;
pub mod transport;

pub use self::bouncer::Bouncer;
pub use self::casemap::Casemap;
pub use self::client::{Client, ClientConfig, ClientEvent};
pub use self::error::{
    AttachError, ClientError, ConfigError, ConnectError, MessageParseError, ModeParseError,
    ProtocolError, StateError,
};
pub use self::irc::IrcCodec;
pub use self::isupport::{ChanModes, Isupport, PrefixSpec};
pub use self::line::LineCodec;
pub use self::message::Message;
pub use self::mode::{Direction, ModeChange};
pub use self::prefix::Prefix;
pub use self::response::Response;
pub use self::server::{AttachPolicy, Gateway, Server};
pub use self::session::SessionHandle;
pub use self::state::NetworkState;
