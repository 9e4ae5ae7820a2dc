//! Upstream connection events and the observer registry.

use std::sync::Arc;

use parking_lot::RwLock;

use super::Client;
use crate::Message;

/// Something that happened on an upstream connection.
///
/// For one inbound message observers see, in order: [`Register`] (after
/// 001 only), [`Message`], then [`Command`]. The state tracker has already
/// applied the message by then.
///
/// [`Register`]: ClientEvent::Register
/// [`Message`]: ClientEvent::Message
/// [`Command`]: ClientEvent::Command
#[derive(Clone, Copy, Debug)]
pub enum ClientEvent<'a> {
    /// Transport open; registration lines are about to be sent.
    Connect,
    /// 001 received.
    Register,
    /// Every inbound message.
    Message(&'a Message),
    /// Every inbound message, keyed by its lower-cased command.
    Command {
        name: &'a str,
        message: &'a Message,
    },
    /// A message was queued for the server.
    Sent(&'a Message),
    /// The transport is gone; `error` is set when it failed.
    Close { error: Option<&'a str> },
}

/// A registered event callback.
pub type Observer = Arc<dyn Fn(&Client, &ClientEvent<'_>) + Send + Sync>;

/// Copy-on-write observer list, so callbacks may subscribe while an event
/// is being delivered.
#[derive(Default)]
pub(crate) struct Observers {
    list: RwLock<Arc<Vec<Observer>>>,
}

impl Observers {
    pub(crate) fn push(&self, observer: Observer) {
        let mut list = self.list.write();
        let mut next = Vec::with_capacity(list.len() + 1);
        next.extend(list.iter().cloned());
        next.push(observer);
        *list = Arc::new(next);
    }

    pub(crate) fn emit(&self, client: &Client, event: &ClientEvent<'_>) {
        let list = Arc::clone(&*self.list.read());
        for observer in list.iter() {
            observer(client, event);
        }
    }
}
