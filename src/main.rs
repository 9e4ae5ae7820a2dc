//! slirc-bouncer - IRC bouncer daemon.

use std::sync::Arc;

use slirc_bouncer::bouncer::Bouncer;
use slirc_bouncer::client::{Client, ClientEvent};
use slirc_bouncer::config::Config;
use slirc_bouncer::modules;
use slirc_bouncer::server::{Gateway, Server};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "bouncer.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;
    config.validate()?;

    info!(
        server = %config.server.name,
        networks = config.networks.len(),
        "Starting slirc-bouncer"
    );

    let server = Arc::new(Server::new());
    let modules = modules::from_config(&config.modules)?;

    for network in &config.networks {
        let client = Client::new(network.client_config());
        let bouncer = Bouncer::new(network.name.as_str(), client.clone());
        modules::install(&modules, &bouncer);
        server.add_bouncer(Arc::clone(&bouncer));

        client.subscribe(|client, event| {
            if let ClientEvent::Close { error } = event {
                warn!(
                    network = %client.config().name,
                    error = error.unwrap_or("none"),
                    "Upstream connection closed; not reconnecting"
                );
            }
        });

        if let Err(e) = client.connect().await {
            error!(network = %network.name, error = %e, "Failed to connect upstream");
        }
    }

    let gateway = Gateway::bind(&config.listen, &config.server, server).await?;

    tokio::select! {
        result = gateway.run() => result?,
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
    }
    Ok(())
}
