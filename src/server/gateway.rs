//! Gateway - TCP/TLS listener that accepts downstream connections.
//!
//! Each accepted connection runs the registration handshake, is handed to
//! the [`AttachPolicy`], and then relays its lines to the chosen bouncer
//! until either side closes.

use std::io::{BufReader, Cursor};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error, info, warn};

use super::AttachPolicy;
use crate::config::{ListenConfig, ServerConfig, TlsListenConfig};
use crate::line::MAX_LINE_LEN;
use crate::session::{Outgoing, Registered, Registration, RegistrationStep, SessionHandle};
use crate::transport::{MessageReader, MessageWriter, TransportStream};

/// How long a new connection may take to send NICK and USER.
pub const REGISTRATION_TIMEOUT: Duration = Duration::from_secs(60);

struct Shared<P> {
    policy: Arc<P>,
    server_name: String,
    password: Option<String>,
    next_id: AtomicU64,
}

/// The Gateway accepts downstream TCP/TLS connections.
pub struct Gateway<P> {
    plaintext_listener: TcpListener,
    tls_listener: Option<(TcpListener, TlsAcceptor)>,
    shared: Arc<Shared<P>>,
}

impl<P: AttachPolicy> Gateway<P> {
    /// Bind the configured listeners.
    pub async fn bind(
        listen: &ListenConfig,
        server: &ServerConfig,
        policy: Arc<P>,
    ) -> anyhow::Result<Self> {
        let plaintext_listener = TcpListener::bind(listen.address).await?;
        info!(address = %plaintext_listener.local_addr()?, "Plaintext listener bound");

        let tls_listener = match &listen.tls {
            Some(tls_cfg) => {
                let acceptor = Self::load_tls(tls_cfg)?;
                let listener = TcpListener::bind(tls_cfg.address).await?;
                info!(address = %listener.local_addr()?, "TLS listener bound");
                Some((listener, acceptor))
            }
            None => None,
        };

        Ok(Self {
            plaintext_listener,
            tls_listener,
            shared: Arc::new(Shared {
                policy,
                server_name: server.name.clone(),
                password: server.password.clone(),
                next_id: AtomicU64::new(1),
            }),
        })
    }

    /// Load the certificate chain and key and build a TlsAcceptor.
    fn load_tls(config: &TlsListenConfig) -> anyhow::Result<TlsAcceptor> {
        let cert_file = std::fs::read(&config.cert_path)?;
        let certs: Vec<CertificateDer<'static>> =
            rustls_pemfile::certs(&mut BufReader::new(Cursor::new(cert_file)))
                .collect::<Result<Vec<_>, _>>()?;
        if certs.is_empty() {
            anyhow::bail!("No certificates found in {}", config.cert_path);
        }

        let key_file = std::fs::read(&config.key_path)?;
        let key: PrivateKeyDer<'static> =
            rustls_pemfile::private_key(&mut BufReader::new(Cursor::new(key_file)))?
                .ok_or_else(|| anyhow::anyhow!("No private keys found in {}", config.key_path))?;

        let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
        let tls_config = rustls::ServerConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()?
            .with_no_client_auth()
            .with_single_cert(certs, key)?;

        Ok(TlsAcceptor::from(Arc::new(tls_config)))
    }

    /// Address of the plaintext listener.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.plaintext_listener.local_addr()
    }

    /// Address of the TLS listener, if one is bound.
    pub fn tls_local_addr(&self) -> Option<SocketAddr> {
        self.tls_listener
            .as_ref()
            .and_then(|(listener, _)| listener.local_addr().ok())
    }

    /// Accept connections forever.
    pub async fn run(self) -> anyhow::Result<()> {
        if let Some((tls_listener, acceptor)) = self.tls_listener {
            let shared = Arc::clone(&self.shared);
            tokio::spawn(async move {
                loop {
                    match tls_listener.accept().await {
                        Ok((stream, addr)) => {
                            info!(%addr, "TLS connection accepted");
                            let shared = Arc::clone(&shared);
                            let acceptor = acceptor.clone();
                            tokio::spawn(async move {
                                match acceptor.accept(stream).await {
                                    Ok(tls_stream) => {
                                        serve(shared, TransportStream::server_tls(tls_stream), addr)
                                            .await
                                    }
                                    Err(e) => warn!(%addr, error = %e, "TLS handshake failed"),
                                }
                            });
                        }
                        Err(e) => error!(error = %e, "Failed to accept TLS connection"),
                    }
                }
            });
        }

        loop {
            match self.plaintext_listener.accept().await {
                Ok((stream, addr)) => {
                    info!(%addr, "Connection accepted");
                    let shared = Arc::clone(&self.shared);
                    tokio::spawn(serve(shared, TransportStream::tcp(stream), addr));
                }
                Err(e) => error!(error = %e, "Failed to accept connection"),
            }
        }
    }
}

/// Drive one downstream connection from registration to close.
async fn serve<P: AttachPolicy>(shared: Arc<Shared<P>>, stream: TransportStream, addr: SocketAddr) {
    let id = shared.next_id.fetch_add(1, Ordering::Relaxed);
    let (mut reader, writer) = stream.framed(None, MAX_LINE_LEN);
    let (tx, rx) = mpsc::unbounded_channel();
    let writer_task = tokio::spawn(write_loop(writer, rx));

    let registered = match tokio::time::timeout(
        REGISTRATION_TIMEOUT,
        register(&shared, &mut reader, &tx),
    )
    .await
    {
        Ok(Some(registered)) => registered,
        Ok(None) => {
            drop(tx);
            let _ = writer_task.await;
            info!(session = id, %addr, "Connection closed before registration");
            return;
        }
        Err(_) => {
            warn!(session = id, %addr, "Registration timed out");
            writer_task.abort();
            return;
        }
    };

    let session = SessionHandle::new(id, registered, &shared.server_name, tx);
    info!(session = id, %addr, nick = %session.nick(), login = %session.login(), "Session registered");

    let bouncer = match shared.policy.try_attach(&session) {
        Ok(bouncer) => bouncer,
        Err(_) => {
            drop(session);
            let _ = writer_task.await;
            return;
        }
    };

    loop {
        tokio::select! {
            next = reader.next() => match next {
                Some(Ok(msg)) => bouncer.relay_from_session(&session, &msg),
                Some(Err(e)) => {
                    warn!(session = id, error = %e, "Session read failed");
                    break;
                }
                None => break,
            },
            _ = session.closed() => break,
        }
    }

    bouncer.detach(id);
    writer_task.abort();
    info!(session = id, %addr, "Session closed");
}

/// Run the registration handshake; `None` means the connection ended.
///
/// A rejected registration queues its replies and the disconnect, so the
/// caller only has to wait for the writer.
async fn register<P>(
    shared: &Shared<P>,
    reader: &mut MessageReader,
    tx: &mpsc::UnboundedSender<Outgoing>,
) -> Option<Registered> {
    let mut registration = Registration::new(&shared.server_name, shared.password.as_deref());
    loop {
        let msg = tokio::select! {
            next = reader.next() => next,
            _ = tx.closed() => return None,
        };
        let msg = match msg {
            Some(Ok(msg)) => msg,
            Some(Err(e)) => {
                debug!(error = %e, "Read failed during registration");
                return None;
            }
            None => return None,
        };

        match registration.feed(&msg) {
            RegistrationStep::Continue(replies) => {
                for reply in replies {
                    let _ = tx.send(Outgoing::Message(reply));
                }
            }
            RegistrationStep::Complete(registered) => return Some(registered),
            RegistrationStep::Reject(replies, reason) => {
                warn!(reason = %reason, "Registration rejected");
                for reply in replies {
                    let _ = tx.send(Outgoing::Message(reply));
                }
                let error = crate::Message::new("ERROR", [format!("Closing link ({})", reason)]);
                let _ = tx.send(Outgoing::Message(error));
                let _ = tx.send(Outgoing::Disconnect(reason));
                return None;
            }
        }
    }
}

async fn write_loop(mut writer: MessageWriter, mut rx: mpsc::UnboundedReceiver<Outgoing>) {
    while let Some(item) = rx.recv().await {
        match item {
            Outgoing::Message(msg) => {
                if let Err(e) = writer.send(msg).await {
                    debug!(error = %e, "Session write failed");
                    return;
                }
            }
            Outgoing::Disconnect(reason) => {
                debug!(reason = %reason, "Closing session");
                let _ = writer.close().await;
                return;
            }
        }
    }
}
