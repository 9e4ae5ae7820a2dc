//! E-mail notification of mentions while no session is attached.

use std::sync::{Arc, Weak};

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use tracing::{debug, info, warn};

use super::Module;
use crate::bouncer::Bouncer;
use crate::client::{Client, ClientEvent};
use crate::config::AwayMailConfig;
use crate::error::ConfigError;
use crate::Message;

/// Delivers a finished mail.
pub trait Mailer: Send + Sync {
    fn deliver(&self, mail: lettre::Message);
}

/// SMTP delivery on the tokio runtime.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// A STARTTLS relay when `relay` is set, otherwise plain SMTP to a
    /// local MTA.
    pub fn new(config: &AwayMailConfig) -> Result<Self, ConfigError> {
        let mut builder = match &config.relay {
            Some(relay) => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(relay)
                .map_err(|e| ConfigError::Invalid(format!("away_mail relay {:?}: {}", relay, e)))?,
            None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous("localhost"),
        };
        if let Some(port) = config.port {
            builder = builder.port(port);
        }
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }
        Ok(SmtpMailer {
            transport: builder.build(),
        })
    }
}

impl Mailer for SmtpMailer {
    fn deliver(&self, mail: lettre::Message) {
        let transport = self.transport.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if let Err(e) = transport.send(mail).await {
                        warn!(error = %e, "away mail not delivered");
                    }
                });
            }
            Err(_) => warn!("no runtime to deliver away mail"),
        }
    }
}

pub struct AwayMail {
    from: Mailbox,
    to: Mailbox,
    mailer: Arc<dyn Mailer>,
}

impl AwayMail {
    pub fn new(config: &AwayMailConfig) -> Result<Self, ConfigError> {
        let mailer = Arc::new(SmtpMailer::new(config)?);
        Self::with_mailer(config, mailer)
    }

    /// Deliver through `mailer` instead of SMTP.
    pub fn with_mailer(config: &AwayMailConfig, mailer: Arc<dyn Mailer>) -> Result<Self, ConfigError> {
        let parse = |field: &str, value: &str| {
            value
                .parse::<Mailbox>()
                .map_err(|e| ConfigError::Invalid(format!("away_mail {} {:?}: {}", field, value, e)))
        };
        Ok(AwayMail {
            from: parse("from", &config.from)?,
            to: parse("to", &config.to)?,
            mailer,
        })
    }
}

/// A PRIVMSG whose text starts with our nick.
fn is_mention(msg: &Message, own_nick: &str) -> bool {
    !own_nick.is_empty() && msg.param(1).is_some_and(|text| text.starts_with(own_nick))
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn render(bouncer: &str, msg: &Message) -> String {
    let nick = escape_html(msg.nick().unwrap_or("*"));
    let user = escape_html(msg.user().unwrap_or(""));
    let host = escape_html(msg.host().unwrap_or(""));
    let target = escape_html(msg.param(0).unwrap_or(""));
    let text = escape_html(msg.param(1).unwrap_or(""));
    format!(
        "<p>{nick} &lt;{user}@{host}&gt; mentioned you at {bouncer}/{target}</p>\n\
         <blockquote style=\"background-color: #F2D8FF; padding: 10px 10px 10px 12px; \
         margin: 0; border-left: 5px solid #A500FF;\">&lt;{nick}&gt; {text}</blockquote>\n",
        bouncer = escape_html(bouncer),
    )
}

impl Module for AwayMail {
    fn name(&self) -> &'static str {
        "away_mail"
    }

    fn attach_client(&self, client: &Client, bouncer: &Arc<Bouncer>) {
        let bouncer: Weak<Bouncer> = Arc::downgrade(bouncer);
        let from = self.from.clone();
        let to = self.to.clone();
        let mailer = Arc::clone(&self.mailer);

        client.subscribe(move |client, event| {
            let ClientEvent::Command { name: "privmsg", message } = event else {
                return;
            };
            let Some(bouncer) = bouncer.upgrade() else {
                return;
            };
            if !is_mention(message, client.state().nick()) || bouncer.is_attached() {
                return;
            }

            let mail = lettre::Message::builder()
                .from(from.clone())
                .to(to.clone())
                .subject(format!("Away mail from {}", bouncer.name()))
                .header(ContentType::TEXT_HTML)
                .body(render(bouncer.name(), message));
            match mail {
                Ok(mail) => {
                    info!(bouncer = %bouncer.name(), to = %to, "mailing mention");
                    mailer.deliver(mail);
                }
                Err(e) => debug!(error = %e, "away mail not built"),
            }
        });
    }
}
