//! The upstream connection.
//!
//! A [`Client`] owns one connection to an IRC server and the
//! [`NetworkState`] built from it. Inbound lines are applied to the state by
//! a reader task, then announced to observers; outbound lines go through a
//! queue drained by a writer task so the read path never waits on the
//! socket.
//!
//! # Example
//!
//! ```no_run
//! use slirc_bouncer::client::{Client, ClientConfig, ClientEvent};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let client = Client::new(ClientConfig::new("libera", "irc.libera.chat", 6667, "alice"));
//! client.subscribe(|client, event| {
//!     if let ClientEvent::Register = event {
//!         let _ = client.send_command("JOIN", ["#rust"]);
//!     }
//! });
//! let task = client.connect().await?;
//! task.await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod events;
pub mod tls;

pub use self::config::{ClientConfig, TlsOptions, DEFAULT_IDLE_TIMEOUT};
pub use self::events::{ClientEvent, Observer};

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use self::events::Observers;
use crate::error::{ClientError, ConnectError};
use crate::line::resolve_encoding;
use crate::state::{ConnectionState, NetworkState, StateAction};
use crate::transport::{MessageReader, MessageWriter, TransportStream};
use crate::Message;

struct Inner {
    config: ClientConfig,
    state: RwLock<NetworkState>,
    observers: Observers,
    outbound: Mutex<Option<mpsc::UnboundedSender<Message>>>,
}

/// Handle to an upstream connection. Cheap to clone.
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

impl Client {
    /// Create a disconnected client.
    pub fn new(config: ClientConfig) -> Self {
        let state = NetworkState::new(&config.nick, &config.user, &config.real);
        Client {
            inner: Arc::new(Inner {
                config,
                state: RwLock::new(state),
                observers: Observers::default(),
                outbound: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Read access to the tracked state.
    ///
    /// Safe to call from inside an observer.
    pub fn state(&self) -> RwLockReadGuard<'_, NetworkState> {
        self.inner.state.read_recursive()
    }

    /// Register an event observer.
    pub fn subscribe<F>(&self, observer: F)
    where
        F: Fn(&Client, &ClientEvent<'_>) + Send + Sync + 'static,
    {
        self.inner.observers.push(Arc::new(observer));
    }

    pub fn is_connected(&self) -> bool {
        self.inner.outbound.lock().is_some()
    }

    /// Queue `message` for the server and raise [`ClientEvent::Sent`].
    pub fn send(&self, message: Message) -> Result<(), ClientError> {
        {
            let outbound = self.inner.outbound.lock();
            let tx = outbound.as_ref().ok_or(ClientError::NotConnected)?;
            debug!(network = %self.inner.config.name, line = %message.to_string().trim_end(), ">>");
            tx.send(message.clone())
                .map_err(|_| ClientError::NotConnected)?;
        }
        self.emit(&ClientEvent::Sent(&message));
        Ok(())
    }

    /// Build a prefix-less message and [`send`](Self::send) it.
    pub fn send_command<C, I, P>(&self, command: C, params: I) -> Result<(), ClientError>
    where
        C: Into<String>,
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.send(Message::new(command, params))
    }

    fn emit(&self, event: &ClientEvent<'_>) {
        self.inner.observers.emit(self, event);
    }

    fn set_connection_state(&self, state: ConnectionState) {
        self.inner.state.write().set_connection_state(state);
    }

    /// Open the transport, send the registration lines and spawn the
    /// connection tasks.
    ///
    /// The returned task finishes when the connection is gone, after the
    /// [`ClientEvent::Close`] event. A failed connect also raises `Close`.
    /// The client never reconnects by itself.
    pub async fn connect(&self) -> Result<JoinHandle<()>, ConnectError> {
        let config = &self.inner.config;
        info!(network = %config.name, host = %config.host, port = config.port, "connecting");
        self.set_connection_state(ConnectionState::Connecting);

        let (reader, writer) = match self.open().await {
            Ok(halves) => halves,
            Err(e) => {
                error!(network = %config.name, error = %e, "connection failed");
                self.set_connection_state(ConnectionState::Disconnected);
                let reason = e.to_string();
                self.emit(&ClientEvent::Close {
                    error: Some(reason.as_str()),
                });
                return Err(e);
            }
        };

        let (tx, rx) = mpsc::unbounded_channel();
        *self.inner.outbound.lock() = Some(tx);
        let writer_task = tokio::spawn(write_loop(writer, rx));

        info!(network = %config.name, "connection established");
        self.set_connection_state(ConnectionState::Registering);
        self.emit(&ClientEvent::Connect);
        self.register_lines();

        let client = self.clone();
        Ok(tokio::spawn(async move {
            let error = client.read_loop(reader).await;
            writer_task.abort();
            client.inner.outbound.lock().take();
            client.set_connection_state(ConnectionState::Disconnected);
            info!(network = %client.inner.config.name, error = ?error, "connection closed");
            client.emit(&ClientEvent::Close {
                error: error.as_deref(),
            });
        }))
    }

    async fn open(&self) -> Result<(MessageReader, MessageWriter), ConnectError> {
        let config = &self.inner.config;
        let encoding = match config.encoding.as_deref() {
            Some(label) => resolve_encoding(label)?,
            None => None,
        };

        let tcp = TcpStream::connect((config.host.as_str(), config.port)).await?;

        let Some(options) = &config.tls else {
            return Ok(TransportStream::tcp(tcp).framed(encoding, config.max_line_len));
        };

        self.set_connection_state(ConnectionState::TlsHandshake);
        let mut options = options.clone();
        options.resolve_files()?;
        let connector = tls::connector(&options)?;
        let server_name = tls::server_name(&config.host)?;
        if let Err(e) = crate::transport::enable_keepalive(&tcp) {
            warn!("failed to enable TCP keepalive: {}", e);
        }
        let stream = connector.connect(server_name, tcp).await?;
        info!(network = %config.name, "TLS connection has been authorized");
        Ok(TransportStream::client_tls(stream).framed(encoding, config.max_line_len))
    }

    fn register_lines(&self) {
        let config = &self.inner.config;
        let lines = config
            .password
            .iter()
            .map(|pass| Message::new("PASS", [pass.as_str()]))
            .chain([
                Message::new("NICK", [config.nick.as_str()]),
                Message::new(
                    "USER",
                    [config.user.as_str(), "0", "*", config.real.as_str()],
                ),
            ]);
        for msg in lines {
            if let Err(e) = self.send(msg) {
                warn!(network = %config.name, error = %e, "registration line not sent");
            }
        }
    }

    /// Read until EOF, error or idle timeout; returns the failure reason.
    async fn read_loop(&self, mut reader: MessageReader) -> Option<String> {
        let idle = self.inner.config.idle_timeout;
        loop {
            match tokio::time::timeout(idle, reader.next()).await {
                Err(_) => {
                    warn!(network = %self.inner.config.name, "connection timed out");
                    return Some("idle timeout".into());
                }
                Ok(None) => return None,
                Ok(Some(Err(e))) => {
                    error!(network = %self.inner.config.name, error = %e, "read failed");
                    return Some(e.to_string());
                }
                Ok(Some(Ok(msg))) => self.handle_incoming(&msg),
            }
        }
    }

    /// Apply one inbound message, then run the observers.
    ///
    /// The write lock is downgraded rather than released, so no attach
    /// snapshot can be taken between the mutation and the relay.
    fn handle_incoming(&self, msg: &Message) {
        debug!(network = %self.inner.config.name, line = %msg.to_string().trim_end(), "<<");

        let mut state = self.inner.state.write();
        let result = state.apply(msg);
        let state = RwLockWriteGuard::downgrade(state);

        let mut registered = false;
        match result {
            Ok(actions) => {
                for action in actions {
                    match action {
                        StateAction::Send(reply) => {
                            if let Err(e) = self.send(*reply) {
                                warn!(network = %self.inner.config.name, error = %e, "reply not sent");
                            }
                        }
                        StateAction::Registered => registered = true,
                    }
                }
            }
            Err(e) => {
                warn!(network = %self.inner.config.name, error = %e, line = %msg.to_string().trim_end(), "state handler failed");
            }
        }

        if registered {
            info!(network = %self.inner.config.name, nick = %state.nick(), "registered");
            self.emit(&ClientEvent::Register);
        }
        self.emit(&ClientEvent::Message(msg));
        let name = msg.command.to_ascii_lowercase();
        self.emit(&ClientEvent::Command {
            name: &name,
            message: msg,
        });
        drop(state);
    }
}

async fn write_loop(mut writer: MessageWriter, mut rx: mpsc::UnboundedReceiver<Message>) {
    while let Some(msg) = rx.recv().await {
        if let Err(e) = writer.send(msg).await {
            error!(error = %e, "write failed");
            break;
        }
    }
}
