//! Downstream sessions.
//!
//! A session is one IRC client connected to the bouncer. The gateway owns
//! its socket; everyone else talks to it through a [`SessionHandle`], which
//! queues [`Outgoing`] items for the session's writer task.

mod registration;

pub use self::registration::{Registered, Registration, RegistrationStep};

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::prefix::Prefix;
use crate::Message;

/// An item on a session's write queue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outgoing {
    /// Write this line.
    Message(Message),
    /// Flush what came before, then close the connection.
    Disconnect(String),
}

struct Inner {
    id: u64,
    nick: String,
    login: String,
    real: String,
    server_name: String,
    tx: mpsc::UnboundedSender<Outgoing>,
}

/// Handle to a registered downstream session. Cheap to clone.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<Inner>,
}

impl SessionHandle {
    /// Wrap a registered session whose writer drains `tx`.
    pub fn new(
        id: u64,
        registered: Registered,
        server_name: &str,
        tx: mpsc::UnboundedSender<Outgoing>,
    ) -> Self {
        SessionHandle {
            inner: Arc::new(Inner {
                id,
                nick: registered.nick,
                login: registered.user,
                real: registered.real,
                server_name: server_name.to_owned(),
                tx,
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Nick given at registration.
    pub fn nick(&self) -> &str {
        &self.inner.nick
    }

    /// The USER name as given, e.g. `alice@libera`.
    pub fn login(&self) -> &str {
        &self.inner.login
    }

    /// The USER name without its `@bouncer` part.
    pub fn username(&self) -> &str {
        self.inner
            .login
            .split_once('@')
            .map_or(self.inner.login.as_str(), |(user, _)| user)
    }

    pub fn realname(&self) -> &str {
        &self.inner.real
    }

    /// The bouncer this session asked for with `USER name@bouncer`.
    pub fn bouncer_name(&self) -> Option<&str> {
        self.inner
            .login
            .rsplit_once('@')
            .map(|(_, bouncer)| bouncer)
            .filter(|bouncer| !bouncer.is_empty())
    }

    /// Name the bouncer uses as the source of its own replies.
    pub fn server_name(&self) -> &str {
        &self.inner.server_name
    }

    /// `nick!user@server` for logs and echoes.
    pub fn prefix(&self) -> Prefix {
        Prefix::new(self.nick(), self.username(), self.server_name())
    }

    /// Send a line sourced from the bouncer's server name.
    pub fn send<C, I, P>(&self, command: C, params: I) -> bool
    where
        C: Into<String>,
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.send_message(
            Message::new(command, params)
                .with_prefix(Prefix::ServerName(self.inner.server_name.clone())),
        )
    }

    /// Queue a line; false once the session is gone.
    pub fn send_message(&self, message: Message) -> bool {
        self.inner.tx.send(Outgoing::Message(message)).is_ok()
    }

    /// Close the session after the lines already queued.
    pub fn disconnect(&self, reason: &str) {
        let _ = self.inner.tx.send(Outgoing::Disconnect(reason.to_owned()));
    }

    pub fn is_closed(&self) -> bool {
        self.inner.tx.is_closed()
    }

    /// Resolves once the session's writer has stopped.
    pub async fn closed(&self) {
        self.inner.tx.closed().await
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.inner.id)
            .field("nick", &self.inner.nick)
            .field("login", &self.inner.login)
            .finish()
    }
}
