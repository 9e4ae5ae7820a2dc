//! NickServ identification after registration.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use super::Module;
use crate::bouncer::Bouncer;
use crate::client::{Client, ClientEvent};
use crate::config::AutoIdentifyConfig;

pub struct AutoIdentify {
    accounts: HashMap<String, AutoIdentifyConfig>,
}

impl AutoIdentify {
    pub fn new(accounts: HashMap<String, AutoIdentifyConfig>) -> Self {
        AutoIdentify { accounts }
    }
}

impl Module for AutoIdentify {
    fn name(&self) -> &'static str {
        "auto_identify"
    }

    fn attach_client(&self, client: &Client, bouncer: &Arc<Bouncer>) {
        let Some(account) = self.accounts.get(bouncer.name()) else {
            return;
        };
        let Some(password) = account.password.clone() else {
            return;
        };
        let nickserv = account.nickserv.clone();
        let nick = account
            .nick
            .clone()
            .unwrap_or_else(|| client.config().nick.clone());
        let line = if nick.is_empty() {
            format!("IDENTIFY {}", password)
        } else {
            format!("IDENTIFY {} {}", nick, password)
        };

        client.subscribe(move |client, event| {
            if !matches!(event, ClientEvent::Register) {
                return;
            }
            info!(network = %client.config().name, nickserv = %nickserv, "identifying");
            if let Err(e) = client.send_command("PRIVMSG", [nickserv.as_str(), line.as_str()]) {
                warn!(network = %client.config().name, error = %e, "identify not sent");
            }
        });
    }
}
