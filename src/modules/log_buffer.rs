//! Scrollback for sessions that were not attached.
//!
//! Keeps the last few PRIVMSG and NOTICE lines per target, from both the
//! upstream and attached sessions, and replays them on attach.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Local};
use parking_lot::Mutex;
use tracing::debug;

use super::Module;
use crate::bouncer::{Bouncer, BouncerEvent};
use crate::client::{Client, ClientEvent};
use crate::config::LogBufferConfig;
use crate::Message;

type Targets = BTreeMap<String, VecDeque<String>>;

struct Store {
    size: usize,
    buffers: Mutex<HashMap<String, Targets>>,
}

impl Store {
    fn push(&self, bouncer: &str, target: &str, text: String) {
        if self.size == 0 {
            return;
        }
        let mut buffers = self.buffers.lock();
        let lines = buffers
            .entry(bouncer.to_owned())
            .or_default()
            .entry(target.to_owned())
            .or_default();
        while lines.len() >= self.size {
            lines.pop_front();
        }
        lines.push_back(stamped(&text, Local::now()));
    }

    /// Buffer a PRIVMSG or NOTICE spoken by `speaker`.
    fn log(&self, bouncer: &str, speaker: &str, msg: &Message) {
        let (Some(target), Some(text)) = (msg.param(0), msg.param(1)) else {
            return;
        };
        let text = if msg.is_command("NOTICE") {
            format!("-{}- {}", speaker, text)
        } else {
            format!("<{}> {}", speaker, text)
        };
        self.push(bouncer, target, text);
    }
}

/// `MM-DD HH:MM:SS text`
fn stamped(text: &str, now: DateTime<Local>) -> String {
    format!("{} {}", now.format("%m-%d %H:%M:%S"), text)
}

fn is_chat(msg: &Message) -> bool {
    msg.is_command("PRIVMSG") || msg.is_command("NOTICE")
}

pub struct LogBuffer {
    store: Arc<Store>,
    use_privmsg: bool,
}

impl LogBuffer {
    pub fn new(config: LogBufferConfig) -> Self {
        LogBuffer {
            store: Arc::new(Store {
                size: config.size,
                buffers: Mutex::new(HashMap::new()),
            }),
            use_privmsg: config.use_privmsg,
        }
    }
}

impl Module for LogBuffer {
    fn name(&self) -> &'static str {
        "log_buffer"
    }

    fn attach_client(&self, client: &Client, bouncer: &Arc<Bouncer>) {
        let store = Arc::clone(&self.store);
        let name = bouncer.name().to_owned();
        client.subscribe(move |_, event| {
            let ClientEvent::Command { name: command, message } = event else {
                return;
            };
            if *command != "privmsg" && *command != "notice" {
                return;
            }
            let speaker = message
                .prefix
                .as_ref()
                .and_then(|prefix| prefix.nick())
                .unwrap_or("*");
            store.log(&name, speaker, message);
        });
    }

    fn attach_bouncer(&self, bouncer: &Bouncer) {
        let store = Arc::clone(&self.store);
        let command = if self.use_privmsg { "PRIVMSG" } else { "NOTICE" };
        bouncer.subscribe(move |bouncer, event| match event {
            BouncerEvent::Sync(session) => {
                let buffers = store.buffers.lock();
                let Some(targets) = buffers.get(bouncer.name()) else {
                    return;
                };
                debug!(bouncer = %bouncer.name(), session = session.id(), targets = targets.len(), "replaying log buffer");
                for (target, lines) in targets {
                    for text in lines {
                        session.send(command, [target.as_str(), text.as_str()]);
                    }
                }
            }
            BouncerEvent::SessionMessage { session, message } if is_chat(message) => {
                store.log(bouncer.name(), session.nick(), message);
            }
            BouncerEvent::SessionMessage { .. } => {}
        });
    }
}
