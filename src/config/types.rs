//! Core configuration types and loading.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use super::modules::ModulesConfig;
use crate::client::{ClientConfig, TlsOptions};
use crate::error::ConfigError;
use crate::line::resolve_encoding;

/// Bouncer configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Bouncer identity.
    #[serde(default)]
    pub server: ServerConfig,
    /// Downstream listeners.
    pub listen: ListenConfig,
    /// Upstream networks, one bouncer each.
    #[serde(default, rename = "network")]
    pub networks: Vec<NetworkConfig>,
    /// Optional feature modules.
    #[serde(default)]
    pub modules: ModulesConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Reject configurations that would misroute sessions or fail every
    /// connect.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.name.is_empty() || self.server.name.contains(' ') {
            return Err(ConfigError::Invalid(format!(
                "server name {:?} is not a valid IRC server name",
                self.server.name
            )));
        }

        let mut seen = HashSet::new();
        for network in &self.networks {
            if network.name.is_empty() {
                return Err(ConfigError::Invalid("network with empty name".into()));
            }
            if !seen.insert(network.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate network name {:?}",
                    network.name
                )));
            }
            if network.nick.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "network {:?} has an empty nick",
                    network.name
                )));
            }
            if network.max_line_len < 512 {
                return Err(ConfigError::Invalid(format!(
                    "network {:?}: max_line_len must be at least 512",
                    network.name
                )));
            }
            if let Some(label) = &network.encoding {
                resolve_encoding(label).map_err(|e| {
                    ConfigError::Invalid(format!("network {:?}: {}", network.name, e))
                })?;
            }
        }

        for name in self
            .modules
            .auto_identify
            .keys()
            .chain(self.modules.auto_mode.keys())
        {
            if !seen.contains(name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "module settings for unknown network {:?}",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// Bouncer identity.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Source of locally generated replies.
    #[serde(default = "default_server_name")]
    pub name: String,
    /// Required downstream `PASS`, if set.
    pub password: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            password: None,
        }
    }
}

fn default_server_name() -> String {
    "bouncer.local".to_string()
}

/// Downstream listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ListenConfig {
    /// Address to bind to (e.g., "127.0.0.1:6667").
    pub address: SocketAddr,
    /// Optional TLS listener.
    pub tls: Option<TlsListenConfig>,
}

/// TLS listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TlsListenConfig {
    /// Address to bind to for TLS (e.g., "127.0.0.1:6697").
    pub address: SocketAddr,
    /// Path to certificate file (PEM format).
    pub cert_path: String,
    /// Path to private key file (PEM format).
    pub key_path: String,
}

/// One upstream network.
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    /// Bouncer name sessions log in with (`USER alice@name`).
    pub name: String,
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub nick: String,
    /// Defaults to the nick.
    pub user: Option<String>,
    /// Defaults to the nick.
    pub real: Option<String>,
    /// Upstream `PASS`.
    pub password: Option<String>,
    /// Wire charset label, e.g. "iso-2022-jp".
    pub encoding: Option<String>,
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// Inbound line length limit in bytes, terminator included.
    #[serde(default = "default_max_line_len")]
    pub max_line_len: usize,
    pub tls: Option<TlsOptions>,
}

fn default_port() -> u16 {
    6667
}

fn default_max_line_len() -> usize {
    crate::line::MAX_LINE_LEN
}

fn default_idle_timeout_secs() -> u64 {
    crate::client::DEFAULT_IDLE_TIMEOUT.as_secs()
}

impl NetworkConfig {
    /// Settings for this network's upstream connection.
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(&self.name, &self.host, self.port, &self.nick);
        if let Some(user) = &self.user {
            config.user = user.clone();
        }
        if let Some(real) = &self.real {
            config.real = real.clone();
        }
        config.password = self.password.clone();
        config.encoding = self.encoding.clone();
        config.tls = self.tls.clone();
        config.idle_timeout = Duration::from_secs(self.idle_timeout_secs);
        config.max_line_len = self.max_line_len;
        config
    }
}
