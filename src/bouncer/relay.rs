//! Session-to-upstream relay policy.

use tracing::{debug, info, warn};

use super::{Bouncer, BouncerEvent};
use crate::prefix::Prefix;
use crate::session::SessionHandle;
use crate::Message;

/// What the bouncer does with one line sent by an attached session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    /// Discard it.
    Drop,
    /// Detach and close the session; the upstream stays.
    Quit,
    /// Answer with a local `PONG` carrying this token.
    Pong(String),
    /// Send it upstream.
    Forward,
    /// Send it upstream and show it to the other attached sessions.
    ForwardAndEcho,
}

impl Route {
    pub fn for_message(msg: &Message) -> Route {
        match msg.command.to_ascii_uppercase().as_str() {
            "PASS" | "USER" | "CAP" | "PONG" => Route::Drop,
            "QUIT" => Route::Quit,
            "PING" => Route::Pong(msg.param(0).unwrap_or_default().to_owned()),
            "PRIVMSG" | "NOTICE" => Route::ForwardAndEcho,
            _ => Route::Forward,
        }
    }
}

impl Bouncer {
    /// Apply the relay policy to a line from `session`.
    pub fn relay_from_session(&self, session: &SessionHandle, msg: &Message) {
        let route = Route::for_message(msg);
        debug!(bouncer = %self.name, session = session.id(), route = ?route, line = %msg.to_string().trim_end(), "session line");

        match route {
            Route::Drop => {}
            Route::Quit => {
                self.detach(session.id());
                session.disconnect("Client quit");
            }
            Route::Pong(token) => {
                session.send("PONG", [session.server_name(), token.as_str()]);
            }
            Route::Forward | Route::ForwardAndEcho => {
                let upstream = Message {
                    prefix: None,
                    ..msg.clone()
                };
                if let Err(e) = self.client.send(upstream.clone()) {
                    warn!(bouncer = %self.name, session = session.id(), error = %e, "cannot relay upstream");
                    session.send(
                        "NOTICE",
                        [session.nick(), "Upstream connection is not available"],
                    );
                    return;
                }

                if route == Route::ForwardAndEcho {
                    let echo = {
                        let state = self.client.state();
                        upstream.clone().with_prefix(Prefix::new(
                            state.nick(),
                            state.user(),
                            session.server_name(),
                        ))
                    };
                    self.broadcast(&echo, Some(session.id()));
                }
                if upstream.is_command("NICK") {
                    info!(bouncer = %self.name, session = session.id(), "nick change requested");
                }
                self.emit(&BouncerEvent::SessionMessage {
                    session,
                    message: &upstream,
                });
            }
        }
    }
}
