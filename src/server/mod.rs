//! Routing sessions to bouncers.
//!
//! The [`Gateway`] accepts and registers downstream connections, then hands
//! each session to an [`AttachPolicy`]. [`Server`] is the policy that picks
//! a bouncer from the session's `USER name@bouncer` login.

mod gateway;

pub use self::gateway::{Gateway, REGISTRATION_TIMEOUT};

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{info, warn};

use crate::bouncer::Bouncer;
use crate::error::AttachError;
use crate::session::SessionHandle;

/// Decides where a freshly registered session goes.
///
/// On error the implementation has already told the session why and asked
/// it to disconnect.
pub trait AttachPolicy: Send + Sync + 'static {
    fn try_attach(&self, session: &SessionHandle) -> Result<Arc<Bouncer>, AttachError>;
}

/// Bouncer registry keyed by name.
#[derive(Default)]
pub struct Server {
    bouncers: DashMap<String, Arc<Bouncer>>,
}

impl Server {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `bouncer` under its name, replacing any previous one.
    pub fn add_bouncer(&self, bouncer: Arc<Bouncer>) -> Option<Arc<Bouncer>> {
        let name = bouncer.name().to_owned();
        let previous = self.bouncers.insert(name.clone(), bouncer);
        if previous.is_some() {
            warn!(bouncer = %name, "bouncer replaced");
        } else {
            info!(bouncer = %name, "bouncer added");
        }
        previous
    }

    pub fn bouncer(&self, name: &str) -> Option<Arc<Bouncer>> {
        self.bouncers.get(name).map(|entry| Arc::clone(entry.value()))
    }

    pub fn bouncers(&self) -> Vec<Arc<Bouncer>> {
        self.bouncers
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    fn route(&self, session: &SessionHandle) -> Result<Arc<Bouncer>, AttachError> {
        let name = session.bouncer_name().ok_or(AttachError::NoBouncerName)?;
        self.bouncer(name)
            .ok_or_else(|| AttachError::BouncerNotFound(name.to_owned()))
    }
}

impl AttachPolicy for Server {
    fn try_attach(&self, session: &SessionHandle) -> Result<Arc<Bouncer>, AttachError> {
        let result = self.route(session).and_then(|bouncer| {
            if bouncer.try_attach(session.clone()) {
                Ok(bouncer)
            } else {
                Err(AttachError::SessionClosed)
            }
        });

        if let Err(e) = &result {
            match e {
                AttachError::NoBouncerName => warn!(
                    session = session.id(),
                    login = %session.login(),
                    "Attach failed. You should specify network name within IRC user like YOURNAME@BOUNCERNAME."
                ),
                AttachError::BouncerNotFound(name) => warn!(
                    session = session.id(),
                    prefix = %session.prefix(),
                    "Can not find network named \"{}\"",
                    name
                ),
                _ => info!(session = session.id(), error = %e, "attach abandoned"),
            }
            session.send("ERROR", [format!("Closing link ({})", e)]);
            session.disconnect(&e.to_string());
        }
        result
    }
}
