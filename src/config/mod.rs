//! Configuration loading.
//!
//! - `types`: the TOML schema (server identity, listeners, networks)
//! - `modules`: settings for the optional feature modules

mod modules;
mod types;

pub use self::modules::{AutoIdentifyConfig, AwayMailConfig, LogBufferConfig, ModulesConfig};
pub use self::types::{Config, ListenConfig, NetworkConfig, ServerConfig, TlsListenConfig};

pub use crate::error::ConfigError;
