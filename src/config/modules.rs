//! Feature module configuration.

use std::collections::HashMap;

use serde::Deserialize;

/// Settings for the optional modules; absent sections disable them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModulesConfig {
    /// NickServ identification, keyed by network name.
    #[serde(default)]
    pub auto_identify: HashMap<String, AutoIdentifyConfig>,
    /// User modes to set after registration, keyed by network name.
    #[serde(default)]
    pub auto_mode: HashMap<String, String>,
    /// Scrollback replayed to attaching sessions.
    pub log_buffer: Option<LogBufferConfig>,
    /// Mail mentions received while no session is attached.
    pub away_mail: Option<AwayMailConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AutoIdentifyConfig {
    #[serde(default = "default_nickserv")]
    pub nickserv: String,
    /// Account name, for services that take `IDENTIFY <account> <password>`.
    pub nick: Option<String>,
    pub password: Option<String>,
}

fn default_nickserv() -> String {
    "NickServ".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogBufferConfig {
    /// Lines kept per target.
    #[serde(default = "default_log_size")]
    pub size: usize,
    /// Replay as PRIVMSG instead of NOTICE.
    #[serde(default)]
    pub use_privmsg: bool,
}

impl Default for LogBufferConfig {
    fn default() -> Self {
        Self {
            size: default_log_size(),
            use_privmsg: false,
        }
    }
}

fn default_log_size() -> usize {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct AwayMailConfig {
    /// Recipient mailbox, e.g. `Alice <alice@example.org>`.
    pub to: String,
    #[serde(default = "default_mail_from")]
    pub from: String,
    /// SMTP relay reached over STARTTLS; a local MTA when unset.
    pub relay: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for AwayMailConfig {
    fn default() -> Self {
        Self {
            to: String::new(),
            from: default_mail_from(),
            relay: None,
            port: None,
            username: None,
            password: None,
        }
    }
}

fn default_mail_from() -> String {
    "slirc-bouncer <bouncer@localhost>".to_string()
}
