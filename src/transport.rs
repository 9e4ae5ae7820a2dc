//! Byte transports under the IRC codec.
//!
//! Both the upstream connection (client-side TLS) and accepted downstream
//! sessions (server-side TLS) run over a [`TransportStream`], split into
//! halves so reading and writing can live in separate tasks.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use encoding::Encoding;
use socket2::{SockRef, TcpKeepalive};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream as ClientTlsStream;
use tokio_rustls::server::TlsStream as ServerTlsStream;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::warn;

use crate::irc::IrcCodec;

/// Framed message stream over a read half.
pub type MessageReader = FramedRead<TransportReadHalf, IrcCodec>;

/// Framed message sink over a write half.
pub type MessageWriter = FramedWrite<TransportWriteHalf, IrcCodec>;

/// A connected byte stream.
#[non_exhaustive]
pub enum TransportStream {
    /// Plain TCP stream.
    Tcp(TcpStream),
    /// Client-side TLS stream (boxed for size).
    ClientTls(Box<ClientTlsStream<TcpStream>>),
    /// Server-side TLS stream (boxed for size).
    ServerTls(Box<ServerTlsStream<TcpStream>>),
}

/// Owned read half for a transport after splitting.
pub enum TransportReadHalf {
    /// TCP read half.
    Tcp(tokio::net::tcp::OwnedReadHalf),
    /// Client-side TLS read half.
    ClientTls(tokio::io::ReadHalf<ClientTlsStream<TcpStream>>),
    /// Server-side TLS read half.
    ServerTls(tokio::io::ReadHalf<ServerTlsStream<TcpStream>>),
}

/// Owned write half for a transport after splitting.
pub enum TransportWriteHalf {
    /// TCP write half.
    Tcp(tokio::net::tcp::OwnedWriteHalf),
    /// Client-side TLS write half.
    ClientTls(tokio::io::WriteHalf<ClientTlsStream<TcpStream>>),
    /// Server-side TLS write half.
    ServerTls(tokio::io::WriteHalf<ServerTlsStream<TcpStream>>),
}

/// Turn on TCP keepalive probes for a socket.
pub fn enable_keepalive(stream: &TcpStream) -> std::io::Result<()> {
    let keepalive = TcpKeepalive::new()
        .with_time(Duration::from_secs(120))
        .with_interval(Duration::from_secs(30));
    SockRef::from(stream).set_tcp_keepalive(&keepalive)
}

impl TransportStream {
    /// Wrap a plain TCP stream, enabling keepalive.
    pub fn tcp(stream: TcpStream) -> Self {
        if let Err(e) = enable_keepalive(&stream) {
            warn!("failed to enable TCP keepalive: {}", e);
        }
        Self::Tcp(stream)
    }

    pub fn client_tls(stream: ClientTlsStream<TcpStream>) -> Self {
        Self::ClientTls(Box::new(stream))
    }

    pub fn server_tls(stream: ServerTlsStream<TcpStream>) -> Self {
        Self::ServerTls(Box::new(stream))
    }

    pub fn is_tls(&self) -> bool {
        !matches!(self, Self::Tcp(_))
    }

    /// Split into owned halves.
    pub fn split(self) -> (TransportReadHalf, TransportWriteHalf) {
        match self {
            Self::Tcp(stream) => {
                let (r, w) = stream.into_split();
                (TransportReadHalf::Tcp(r), TransportWriteHalf::Tcp(w))
            }
            Self::ClientTls(stream) => {
                let (r, w) = tokio::io::split(*stream);
                (
                    TransportReadHalf::ClientTls(r),
                    TransportWriteHalf::ClientTls(w),
                )
            }
            Self::ServerTls(stream) => {
                let (r, w) = tokio::io::split(*stream);
                (
                    TransportReadHalf::ServerTls(r),
                    TransportWriteHalf::ServerTls(w),
                )
            }
        }
    }

    /// Split and frame both halves with an [`IrcCodec`] for `encoding`,
    /// accepting inbound lines up to `max_len` bytes.
    pub fn framed(
        self,
        encoding: Option<&'static Encoding>,
        max_len: usize,
    ) -> (MessageReader, MessageWriter) {
        let (r, w) = self.split();
        (
            FramedRead::new(r, IrcCodec::with_encoding(encoding).max_len(max_len)),
            FramedWrite::new(w, IrcCodec::with_encoding(encoding)),
        )
    }
}

impl AsyncRead for TransportReadHalf {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            Self::Tcp(inner) => Pin::new(inner).poll_read(cx, buf),
            Self::ClientTls(inner) => Pin::new(inner).poll_read(cx, buf),
            Self::ServerTls(inner) => Pin::new(inner).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for TransportWriteHalf {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        match self.get_mut() {
            Self::Tcp(inner) => Pin::new(inner).poll_write(cx, buf),
            Self::ClientTls(inner) => Pin::new(inner).poll_write(cx, buf),
            Self::ServerTls(inner) => Pin::new(inner).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            Self::Tcp(inner) => Pin::new(inner).poll_flush(cx),
            Self::ClientTls(inner) => Pin::new(inner).poll_flush(cx),
            Self::ServerTls(inner) => Pin::new(inner).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            Self::Tcp(inner) => Pin::new(inner).poll_shutdown(cx),
            Self::ClientTls(inner) => Pin::new(inner).poll_shutdown(cx),
            Self::ServerTls(inner) => Pin::new(inner).poll_shutdown(cx),
        }
    }
}
