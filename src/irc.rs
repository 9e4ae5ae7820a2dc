//! IRC message codec for tokio.
//!
//! This module provides a codec that encodes and decodes IRC [`Message`] types
//! using the tokio codec framework.

use bytes::BytesMut;
use encoding::Encoding;
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

use crate::error;
use crate::line::LineCodec;
use crate::message::Message;

/// Tokio codec for encoding/decoding IRC messages.
///
/// Wraps [`LineCodec`] and parses lines into [`Message`] types. Lines that
/// do not parse (blank lines, a bare prefix) are skipped.
pub struct IrcCodec {
    inner: LineCodec,
}

impl IrcCodec {
    /// Create a new codec with the specified encoding.
    ///
    /// # Arguments
    /// * `label` - Encoding label (e.g., "utf-8", "iso-8859-1")
    pub fn new(label: &str) -> error::Result<Self> {
        LineCodec::new(label).map(|codec| Self { inner: codec })
    }

    /// Create a new codec for an already resolved character set.
    pub fn with_encoding(encoding: Option<&'static Encoding>) -> Self {
        Self {
            inner: LineCodec::with_encoding(encoding),
        }
    }

    /// Replace the inbound line length limit.
    ///
    /// # Arguments
    /// * `max_len` - Maximum line length in bytes, terminator included
    pub fn max_len(self, max_len: usize) -> Self {
        Self {
            inner: self.inner.max_len(max_len),
        }
    }

    /// Cut outgoing data at its first CR or LF and terminate it with CRLF.
    ///
    /// Data without any line ending is returned unchanged.
    pub fn sanitize(mut data: String) -> String {
        if let Some(pos) = data.find(['\r', '\n']) {
            data.truncate(pos);
            data.push_str("\r\n");
        }
        data
    }

    fn next_message(&mut self, line: Option<String>) -> Option<Option<Message>> {
        let line = match line {
            Some(line) => line,
            None => return Some(None),
        };
        match Message::parse(&line) {
            Ok(msg) => Some(Some(msg)),
            Err(err) => {
                debug!(%err, line = %line, "skipping unparseable line");
                None
            }
        }
    }
}

impl Decoder for IrcCodec {
    type Item = Message;
    type Error = error::ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> error::Result<Option<Message>> {
        loop {
            let line = self.inner.decode(src)?;
            if let Some(result) = self.next_message(line) {
                return Ok(result);
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> error::Result<Option<Message>> {
        loop {
            let line = self.inner.decode_eof(src)?;
            if let Some(result) = self.next_message(line) {
                return Ok(result);
            }
        }
    }
}

impl Encoder<Message> for IrcCodec {
    type Error = error::ProtocolError;

    fn encode(&mut self, msg: Message, dst: &mut BytesMut) -> error::Result<()> {
        self.inner.encode(Self::sanitize(msg.to_string()), dst)
    }
}
