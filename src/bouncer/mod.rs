//! Bouncers: one upstream connection shared by many sessions.
//!
//! A [`Bouncer`] relays every inbound upstream message to each attached
//! [`SessionHandle`] and forwards what sessions send to the upstream
//! [`Client`]. Attaching replays a [`snapshot`] of the tracked state first.
//!
//! The attach path and the relay path both take the client's state read
//! lock before the session list lock. Because the client applies a message
//! under the write lock and relays it under the downgraded read lock, a
//! snapshot is never taken between a state change and its relay.

mod relay;
mod snapshot;

pub use self::relay::Route;
pub use self::snapshot::snapshot;

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use crate::client::{Client, ClientEvent};
use crate::session::SessionHandle;
use crate::Message;

/// Something that happened on a bouncer.
#[derive(Clone, Copy, Debug)]
pub enum BouncerEvent<'a> {
    /// A session was attached and has received the snapshot.
    ///
    /// Delivered before any live line reaches the session. Observers must
    /// not attach or detach sessions from here.
    Sync(&'a SessionHandle),
    /// A session line was relayed upstream.
    SessionMessage {
        session: &'a SessionHandle,
        message: &'a Message,
    },
}

/// A registered bouncer event callback.
pub type BouncerObserver = Arc<dyn Fn(&Bouncer, &BouncerEvent<'_>) + Send + Sync>;

pub struct Bouncer {
    name: String,
    client: Client,
    sessions: Mutex<Vec<SessionHandle>>,
    observers: RwLock<Arc<Vec<BouncerObserver>>>,
}

impl Bouncer {
    /// Create a bouncer named `name` over `client` and start relaying its
    /// inbound messages.
    pub fn new(name: impl Into<String>, client: Client) -> Arc<Self> {
        let bouncer = Arc::new(Bouncer {
            name: name.into(),
            client: client.clone(),
            sessions: Mutex::new(Vec::new()),
            observers: RwLock::new(Arc::new(Vec::new())),
        });

        let weak = Arc::downgrade(&bouncer);
        client.subscribe(move |_, event| {
            let ClientEvent::Message(msg) = event else {
                return;
            };
            if let Some(bouncer) = weak.upgrade() {
                bouncer.broadcast(msg, None);
            }
        });
        bouncer
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Register a bouncer event observer.
    pub fn subscribe<F>(&self, observer: F)
    where
        F: Fn(&Bouncer, &BouncerEvent<'_>) + Send + Sync + 'static,
    {
        let mut list = self.observers.write();
        let mut next = Vec::with_capacity(list.len() + 1);
        next.extend(list.iter().cloned());
        next.push(Arc::new(observer) as BouncerObserver);
        *list = Arc::new(next);
    }

    fn emit(&self, event: &BouncerEvent<'_>) {
        let list = Arc::clone(&*self.observers.read());
        for observer in list.iter() {
            observer(self, event);
        }
    }

    /// Attach `session`: replay the snapshot, add it to the relay set and
    /// raise [`BouncerEvent::Sync`], all without letting a live line in
    /// between. Returns false if the session was already gone.
    pub fn try_attach(&self, session: SessionHandle) -> bool {
        let state = self.client.state();
        let mut sessions = self.sessions.lock();

        for line in snapshot(&state, session.server_name()) {
            if !session.send_message(line) {
                debug!(bouncer = %self.name, session = session.id(), "session closed during attach");
                return false;
            }
        }
        sessions.push(session.clone());
        info!(
            bouncer = %self.name,
            session = session.id(),
            nick = %session.nick(),
            attached = sessions.len(),
            "session attached"
        );
        self.emit(&BouncerEvent::Sync(&session));
        drop(sessions);
        drop(state);
        true
    }

    /// Remove a session from the relay set. The upstream is unaffected.
    pub fn detach(&self, id: u64) -> bool {
        let mut sessions = self.sessions.lock();
        let before = sessions.len();
        sessions.retain(|s| s.id() != id);
        let removed = sessions.len() != before;
        if removed {
            info!(bouncer = %self.name, session = id, attached = sessions.len(), "session detached");
        }
        removed
    }

    /// Whether at least one session is attached.
    pub fn is_attached(&self) -> bool {
        !self.sessions.lock().is_empty()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Send `msg` to every attached session except `except`, detaching
    /// sessions whose queue has closed.
    pub fn broadcast(&self, msg: &Message, except: Option<u64>) {
        let mut sessions = self.sessions.lock();
        sessions.retain(|session| {
            if Some(session.id()) == except {
                return true;
            }
            let alive = session.send_message(msg.clone());
            if !alive {
                info!(bouncer = %self.name, session = session.id(), "session gone, detaching");
            }
            alive
        });
    }
}

impl std::fmt::Debug for Bouncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bouncer")
            .field("name", &self.name)
            .field("sessions", &self.session_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientConfig;
    use crate::session::tests::session;
    use crate::session::Outgoing;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn bouncer() -> Arc<Bouncer> {
        let client = Client::new(ClientConfig::new("libera", "127.0.0.1", 6667, "alice"));
        Bouncer::new("libera", client)
    }

    fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<Outgoing>) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(item) = rx.try_recv() {
            if let Outgoing::Message(msg) = item {
                lines.push(msg.to_string().trim_end().to_owned());
            }
        }
        lines
    }

    #[test]
    fn test_attach_sends_snapshot_then_sync() {
        let bouncer = bouncer();
        let synced = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&synced);
        bouncer.subscribe(move |_, event| {
            if let BouncerEvent::Sync(session) = event {
                session.send("NOTICE", [session.nick(), "synced"]);
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        let (handle, mut rx) = session(1, "alice@libera");
        assert!(!bouncer.is_attached());
        assert!(bouncer.try_attach(handle));
        assert!(bouncer.is_attached());
        assert_eq!(synced.load(Ordering::SeqCst), 1);

        let lines = drain(&mut rx);
        assert!(lines[0].starts_with(":bouncer.test 001 alice "));
        assert_eq!(lines.last().unwrap(), ":bouncer.test NOTICE alice synced");
    }

    #[test]
    fn test_broadcast_skips_sender_and_drops_closed() {
        let bouncer = bouncer();
        let (a, mut rx_a) = session(1, "alice@libera");
        let (b, rx_b) = session(2, "alice@libera");
        bouncer.try_attach(a);
        bouncer.try_attach(b);
        drain(&mut rx_a);
        drop(rx_b);

        let msg = Message::parse(":bob!b@h PRIVMSG #rust :hi").unwrap();
        bouncer.broadcast(&msg, None);
        assert_eq!(bouncer.session_count(), 1);
        assert_eq!(drain(&mut rx_a), vec![":bob!b@h PRIVMSG #rust :hi"]);

        bouncer.broadcast(&msg, Some(1));
        assert!(drain(&mut rx_a).is_empty());
    }

    #[test]
    fn test_detach() {
        let bouncer = bouncer();
        let (a, _rx) = session(7, "alice@libera");
        bouncer.try_attach(a);
        assert!(bouncer.detach(7));
        assert!(!bouncer.detach(7));
        assert!(!bouncer.is_attached());
    }

    #[test]
    fn test_attach_of_closed_session_fails() {
        let bouncer = bouncer();
        let (a, rx) = session(1, "alice@libera");
        drop(rx);
        assert!(!bouncer.try_attach(a));
        assert!(!bouncer.is_attached());
    }
}
