//! Optional feature modules.
//!
//! A [`Module`] hooks into each bouncer once at startup, through the
//! client's and the bouncer's observer lists. Modules never touch the
//! tracked state except to read it.

mod auto_identify;
mod auto_mode;
mod away_mail;
mod log_buffer;

pub use self::auto_identify::AutoIdentify;
pub use self::auto_mode::AutoMode;
pub use self::away_mail::{AwayMail, Mailer, SmtpMailer};
pub use self::log_buffer::LogBuffer;

use std::sync::Arc;

use crate::bouncer::Bouncer;
use crate::client::Client;
use crate::config::ModulesConfig;
use crate::error::ConfigError;

pub trait Module: Send + Sync {
    fn name(&self) -> &'static str;

    /// Hook the upstream connection of `bouncer`.
    fn attach_client(&self, _client: &Client, _bouncer: &Arc<Bouncer>) {}

    /// Hook the bouncer itself.
    fn attach_bouncer(&self, _bouncer: &Bouncer) {}
}

/// The modules enabled by `config`.
pub fn from_config(config: &ModulesConfig) -> Result<Vec<Box<dyn Module>>, ConfigError> {
    let mut modules: Vec<Box<dyn Module>> = Vec::new();
    if !config.auto_identify.is_empty() {
        modules.push(Box::new(AutoIdentify::new(config.auto_identify.clone())));
    }
    if !config.auto_mode.is_empty() {
        modules.push(Box::new(AutoMode::new(config.auto_mode.clone())));
    }
    if let Some(log_buffer) = &config.log_buffer {
        modules.push(Box::new(LogBuffer::new(log_buffer.clone())));
    }
    if let Some(away_mail) = &config.away_mail {
        modules.push(Box::new(AwayMail::new(away_mail)?));
    }
    Ok(modules)
}

/// Hook every module into `bouncer` and its client.
pub fn install(modules: &[Box<dyn Module>], bouncer: &Arc<Bouncer>) {
    for module in modules {
        tracing::debug!(module = module.name(), bouncer = %bouncer.name(), "installing module");
        module.attach_client(bouncer.client(), bouncer);
        module.attach_bouncer(bouncer);
    }
}
