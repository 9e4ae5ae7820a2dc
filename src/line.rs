//! Line-based codec for tokio.
//!
//! This module reads and writes newline-terminated lines, converting between
//! the wire character set and Rust strings.

use bytes::{Buf, BytesMut};
use encoding::{Encoding, UTF_8};
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use crate::error;

/// Default inbound line length limit, terminator included.
pub const MAX_LINE_LEN: usize = 8191;

/// Look up a character set by its WHATWG label.
///
/// UTF-8 is reported as `None`, meaning "no conversion".
pub fn resolve_encoding(label: &str) -> error::Result<Option<&'static Encoding>> {
    match Encoding::for_label(label.trim().as_bytes()) {
        Some(enc) if enc == UTF_8 => Ok(None),
        Some(enc) => Ok(Some(enc)),
        None => Err(error::ProtocolError::UnknownEncoding(label.to_owned())),
    }
}

/// Decode one line of wire bytes.
///
/// Bytes that are malformed in `encoding` fall back to lossy UTF-8.
pub fn decode_line(raw: &[u8], encoding: Option<&'static Encoding>) -> String {
    if let Some(enc) = encoding {
        if let Some(text) = enc.decode_without_bom_handling_and_without_replacement(raw) {
            return text.into_owned();
        }
    }
    String::from_utf8_lossy(raw).into_owned()
}

/// Encode one line to wire bytes.
///
/// Text with characters `encoding` cannot represent is sent unconverted.
pub fn encode_line(text: &str, encoding: Option<&'static Encoding>) -> Vec<u8> {
    if let Some(enc) = encoding {
        let (bytes, _, had_errors) = enc.encode(text);
        if !had_errors {
            return bytes.into_owned();
        }
    }
    text.as_bytes().to_vec()
}

/// Line-based codec that handles newline-terminated messages.
///
/// Lines longer than the limit are dropped whole with a warning; the
/// stream continues with the next line.
pub struct LineCodec {
    encoding: Option<&'static Encoding>,
    /// Index of next byte to check for newline
    next_index: usize,
    /// Maximum line length
    max_len: usize,
    /// Skipping the rest of an oversized line
    discarding: bool,
}

impl LineCodec {
    /// Create a new codec for the labelled character set.
    ///
    /// # Arguments
    /// * `label` - Encoding label (e.g., "utf-8", "iso-2022-jp")
    pub fn new(label: &str) -> error::Result<Self> {
        Ok(Self::with_encoding(resolve_encoding(label)?))
    }

    /// Create a new codec for an already resolved character set.
    pub fn with_encoding(encoding: Option<&'static Encoding>) -> Self {
        Self {
            encoding,
            next_index: 0,
            max_len: MAX_LINE_LEN,
            discarding: false,
        }
    }

    /// Replace the inbound line length limit.
    pub fn max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    /// The character set this codec converts to and from.
    pub fn encoding(&self) -> Option<&'static Encoding> {
        self.encoding
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = error::ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> error::Result<Option<String>> {
        loop {
            let newline = src[self.next_index..].iter().position(|b| *b == b'\n');

            match newline {
                Some(offset) if self.discarding => {
                    src.advance(self.next_index + offset + 1);
                    self.next_index = 0;
                    self.discarding = false;
                }
                Some(offset) => {
                    let line = src.split_to(self.next_index + offset + 1);
                    self.next_index = 0;

                    if line.len() > self.max_len {
                        warn!(len = line.len(), limit = self.max_len, "dropping oversized line");
                        continue;
                    }

                    let mut end = line.len() - 1;
                    if end > 0 && line[end - 1] == b'\r' {
                        end -= 1;
                    }
                    return Ok(Some(decode_line(&line[..end], self.encoding)));
                }
                None if self.discarding => {
                    src.clear();
                    self.next_index = 0;
                    return Ok(None);
                }
                None => {
                    if src.len() > self.max_len {
                        warn!(len = src.len(), limit = self.max_len, "dropping oversized line");
                        src.clear();
                        self.next_index = 0;
                        self.discarding = true;
                    } else {
                        self.next_index = src.len();
                    }
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> error::Result<Option<String>> {
        match self.decode(src)? {
            Some(line) => Ok(Some(line)),
            None => {
                // An unterminated fragment at close is never delivered.
                src.clear();
                self.next_index = 0;
                Ok(None)
            }
        }
    }
}

impl Encoder<String> for LineCodec {
    type Error = error::ProtocolError;

    fn encode(&mut self, msg: String, dst: &mut BytesMut) -> error::Result<()> {
        dst.extend_from_slice(&encode_line(&msg, self.encoding));
        Ok(())
    }
}
