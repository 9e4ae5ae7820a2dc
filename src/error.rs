//! Error types for the bouncer.
//!
//! This module defines the error taxonomy: codec and parse failures,
//! mode-string failures, per-message state handler failures, upstream
//! connection failures, downstream attach failures, and configuration
//! failures.

use thiserror::Error;

use crate::mode::Direction;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Codec-level protocol errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The configured character set label is not known.
    #[error("unknown encoding: {0}")]
    UnknownEncoding(String),

    /// Failed to parse an IRC message.
    #[error("invalid message: {string}")]
    InvalidMessage {
        /// The raw message string.
        string: String,
        /// The underlying parse error.
        #[source]
        cause: MessageParseError,
    },
}

/// Errors encountered when parsing IRC messages.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MessageParseError {
    /// Message was empty.
    #[error("empty message")]
    EmptyMessage,

    /// Command was invalid or missing.
    #[error("invalid command")]
    InvalidCommand,
}

/// Errors encountered when parsing mode strings.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ModeParseError {
    /// A parameter-consuming mode letter found the parameter list exhausted.
    #[error("mode '{direction}{mode}' requires a parameter but none is left")]
    MissingParameter {
        /// The mode letter being processed.
        mode: char,
        /// The direction in effect for the letter.
        direction: Direction,
    },
}

/// Errors raised while applying one inbound message to the tracked state.
///
/// These never escape the message they were raised for.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StateError {
    /// The message lacked a parameter its handler needs.
    #[error("{command}: missing parameter {index}")]
    MissingParameter {
        /// The command being handled.
        command: String,
        /// Zero-based parameter index.
        index: usize,
    },

    /// The message had no source prefix but its handler needs one.
    #[error("{0}: missing source prefix")]
    MissingPrefix(String),

    /// A MODE change could not be resolved.
    #[error("malformed mode change: {0}")]
    MalformedMode(#[from] ModeParseError),
}

/// Errors raised while opening the upstream transport.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConnectError {
    /// DNS, TCP or socket failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The host is not usable as a TLS server name.
    #[error("invalid TLS server name: {0}")]
    InvalidServerName(String),

    /// The TLS configuration could not be built.
    #[error("tls error: {0}")]
    Tls(#[from] rustls::Error),

    /// The trust root set could not be assembled.
    #[error("tls verifier error: {0}")]
    Verifier(#[from] rustls::client::VerifierBuilderError),

    /// PEM material did not contain what was expected.
    #[error("invalid TLS material: {0}")]
    Material(String),

    /// The charset label in the configuration is unknown.
    #[error(transparent)]
    Codec(#[from] ProtocolError),
}

/// Errors from the upstream client handle.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ClientError {
    /// No transport is currently open.
    #[error("not connected")]
    NotConnected,
}

/// Reasons a downstream session could not be attached.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttachError {
    /// The session's login identity carried no `@bouncer` part.
    #[error("no bouncer name supplied; log in as USERNAME@BOUNCERNAME")]
    NoBouncerName,

    /// No bouncer is registered under the requested name.
    #[error("no bouncer named \"{0}\"")]
    BouncerNotFound(String),

    /// The session went away before the snapshot was delivered.
    #[error("session closed during attach")]
    SessionClosed,
}

/// Errors loading or validating the configuration file.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML for the schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration parsed but is not usable.
    #[error("invalid config: {0}")]
    Invalid(String),
}
