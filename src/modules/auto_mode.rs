//! Own user modes set after registration.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use super::Module;
use crate::bouncer::Bouncer;
use crate::client::{Client, ClientEvent};

pub struct AutoMode {
    modes: HashMap<String, String>,
}

impl AutoMode {
    pub fn new(modes: HashMap<String, String>) -> Self {
        AutoMode { modes }
    }
}

impl Module for AutoMode {
    fn name(&self) -> &'static str {
        "auto_mode"
    }

    fn attach_client(&self, client: &Client, bouncer: &Arc<Bouncer>) {
        let Some(modes) = self.modes.get(bouncer.name()).cloned() else {
            return;
        };
        if modes.is_empty() {
            return;
        }

        client.subscribe(move |client, event| {
            if !matches!(event, ClientEvent::Register) {
                return;
            }
            let nick = client.state().nick().to_owned();
            if let Err(e) = client.send_command("MODE", [nick, modes.clone()]) {
                warn!(network = %client.config().name, error = %e, "user mode not sent");
            }
        });
    }
}
