//! Sans-IO protocol state for one upstream connection.
//!
//! [`NetworkState`] does not perform I/O. It consumes parsed inbound
//! messages and produces [`StateAction`]s for the caller to carry out,
//! which keeps every handler a synchronous transformation of data that has
//! already arrived.
//!
//! # Example
//!
//! ```
//! use slirc_bouncer::state::{NetworkState, StateAction};
//! use slirc_bouncer::Message;
//!
//! let mut state = NetworkState::new("alice", "alice", "Alice");
//!
//! let welcome: Message = ":irc.example 001 alice_ :Welcome".parse().unwrap();
//! let actions = state.apply(&welcome).unwrap();
//! assert_eq!(actions, vec![StateAction::Registered]);
//! assert_eq!(state.nick(), "alice_");
//!
//! let join: Message = ":alice_!a@host JOIN #rust".parse().unwrap();
//! state.apply(&join).unwrap();
//! assert!(state.channel("#rust").unwrap().has_user("alice_"));
//! ```

mod channel;
mod dispatch;
mod tracker;

pub use self::channel::{Channel, Topic, User};
pub use self::dispatch::Handler;
pub use self::tracker::NetworkState;

use crate::Message;

/// Lifecycle of the upstream connection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport is open.
    #[default]
    Disconnected,
    /// Resolving and opening the TCP connection.
    Connecting,
    /// Negotiating TLS.
    TlsHandshake,
    /// Sent PASS/NICK/USER, awaiting the welcome (001).
    Registering,
    /// Received 001.
    Established,
}

/// Actions produced by the state tracker.
///
/// The caller is responsible for carrying these out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StateAction {
    /// Send this message to the server.
    Send(Box<Message>),
    /// Registration completed (001 received).
    Registered,
}
