//! Integration test common infrastructure.
//!
//! Provides a fake upstream IRC server, a downstream test client, and
//! helpers for standing up a gateway in front of bouncers.

pub mod client;
pub mod upstream;

#[allow(unused_imports)]
pub use client::TestClient;
#[allow(unused_imports)]
pub use upstream::{FakeUpstream, UpstreamPeer};

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use slirc_bouncer::config::{ListenConfig, ServerConfig};
use slirc_bouncer::server::{Gateway, Server};

/// Name the test gateway uses for its own replies.
#[allow(dead_code)]
pub const SERVER_NAME: &str = "bnc.test";

/// Bind a gateway on an ephemeral port and run it in the background.
#[allow(dead_code)]
pub async fn start_gateway(server: Arc<Server>, password: Option<&str>) -> anyhow::Result<SocketAddr> {
    let listen = ListenConfig {
        address: "127.0.0.1:0".parse()?,
        tls: None,
    };
    let identity = ServerConfig {
        name: SERVER_NAME.to_string(),
        password: password.map(str::to_string),
    };
    let gateway = Gateway::bind(&listen, &identity, server).await?;
    let addr = gateway.local_addr()?;
    tokio::spawn(gateway.run());
    Ok(addr)
}

/// Poll `condition` until it holds or five seconds pass.
#[allow(dead_code)]
pub async fn wait_until<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..500 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
