//! Integration tests for the upstream connection lifecycle.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::{wait_until, FakeUpstream};
use parking_lot::Mutex;
use slirc_bouncer::bouncer::Bouncer;
use slirc_bouncer::client::{Client, ClientConfig, ClientEvent};
use slirc_bouncer::config::ModulesConfig;
use slirc_bouncer::modules;
use slirc_bouncer::state::ConnectionState;

fn config(upstream: &FakeUpstream) -> ClientConfig {
    ClientConfig::new("test", "127.0.0.1", upstream.port(), "alice")
}

fn count_closes(client: &Client) -> Arc<AtomicUsize> {
    let closes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&closes);
    client.subscribe(move |_, event| {
        if let ClientEvent::Close { .. } = event {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });
    closes
}

#[tokio::test]
async fn test_registration_lines() -> anyhow::Result<()> {
    let upstream = FakeUpstream::bind().await?;
    let mut config = config(&upstream);
    config.password = Some("secret".into());
    config.real = "Alice Liddell".into();
    let client = Client::new(config);

    client.connect().await?;
    let mut peer = upstream.accept().await?;
    let lines: Vec<String> = peer
        .expect_registration()
        .await?
        .iter()
        .map(|m| m.to_string())
        .collect();
    assert_eq!(
        lines,
        vec![
            "PASS secret\r\n",
            "NICK alice\r\n",
            "USER alice 0 * :Alice Liddell\r\n",
        ]
    );
    assert_eq!(client.state().connection_state(), ConnectionState::Registering);

    peer.welcome("alice_").await?;
    peer.sync().await?;
    assert_eq!(client.state().connection_state(), ConnectionState::Established);
    assert_eq!(client.state().nick(), "alice_");
    Ok(())
}

#[tokio::test]
async fn test_ping_is_answered() -> anyhow::Result<()> {
    let upstream = FakeUpstream::bind().await?;
    let client = Client::new(config(&upstream));
    client.connect().await?;
    let mut peer = upstream.accept().await?;
    peer.expect_registration().await?;

    peer.send_raw("PING :irc.test").await?;
    assert_eq!(peer.recv().await?.to_string(), "PONG irc.test\r\n");
    Ok(())
}

#[tokio::test]
async fn test_event_order_for_welcome() -> anyhow::Result<()> {
    let upstream = FakeUpstream::bind().await?;
    let client = Client::new(config(&upstream));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);
    client.subscribe(move |client, event| {
        let entry = match event {
            ClientEvent::Connect => "connect".to_string(),
            ClientEvent::Register => format!("register:{}", client.state().nick()),
            ClientEvent::Message(msg) => format!("message:{}", msg.command),
            ClientEvent::Command { name, .. } => format!("command:{}", name),
            ClientEvent::Sent(msg) => format!("sent:{}", msg.command),
            ClientEvent::Close { .. } => "close".to_string(),
        };
        log.lock().push(entry);
    });

    client.connect().await?;
    let mut peer = upstream.accept().await?;
    peer.expect_registration().await?;
    peer.send_raw(":irc.test 001 alice_ :Welcome").await?;
    peer.sync().await?;

    let seen = seen.lock().clone();
    assert_eq!(
        &seen[..7],
        &[
            "connect",
            "sent:NICK",
            "sent:USER",
            "register:alice_",
            "message:001",
            "command:001",
            // the sync PING is answered before its own hooks run
            "sent:PONG",
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_idle_timeout_closes_once() -> anyhow::Result<()> {
    let upstream = FakeUpstream::bind().await?;
    let mut config = config(&upstream);
    config.idle_timeout = Duration::from_millis(300);
    let client = Client::new(config);
    let closes = count_closes(&client);

    let task = client.connect().await?;
    let mut peer = upstream.accept().await?;
    peer.expect_registration().await?;

    tokio::time::timeout(Duration::from_secs(5), task).await??;
    assert_eq!(closes.load(Ordering::SeqCst), 1);
    assert!(!client.is_connected());
    assert_eq!(client.state().connection_state(), ConnectionState::Disconnected);

    // The socket is torn down and no reconnect is attempted.
    peer.expect_eof(Duration::from_secs(5)).await?;
    assert!(upstream
        .accept_timeout(Duration::from_millis(500))
        .await
        .is_err());
    assert_eq!(closes.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn test_upstream_eof_closes_once() -> anyhow::Result<()> {
    let upstream = FakeUpstream::bind().await?;
    let client = Client::new(config(&upstream));
    let closes = count_closes(&client);

    let task = client.connect().await?;
    let peer = upstream.accept().await?;
    drop(peer);

    tokio::time::timeout(Duration::from_secs(5), task).await??;
    assert_eq!(closes.load(Ordering::SeqCst), 1);
    assert!(client.send_command("PRIVMSG", ["#a", "too late"]).is_err());
    Ok(())
}

#[tokio::test]
async fn test_failed_connect_closes_once() -> anyhow::Result<()> {
    let port = {
        let upstream = FakeUpstream::bind().await?;
        upstream.port()
    };
    let client = Client::new(ClientConfig::new("test", "127.0.0.1", port, "alice"));
    let closes = count_closes(&client);

    assert!(client.connect().await.is_err());
    assert_eq!(closes.load(Ordering::SeqCst), 1);
    assert_eq!(client.state().connection_state(), ConnectionState::Disconnected);
    Ok(())
}

#[tokio::test]
async fn test_modules_run_on_register() -> anyhow::Result<()> {
    let upstream = FakeUpstream::bind().await?;
    let client = Client::new(config(&upstream));
    let bouncer = Bouncer::new("test", client.clone());

    let modules_config: ModulesConfig = toml::from_str(
        r#"
[auto_identify.test]
password = "hunter2"

[auto_mode]
test = "+iw"
"#,
    )?;
    modules::install(&modules::from_config(&modules_config)?, &bouncer);

    client.connect().await?;
    let mut peer = upstream.accept().await?;
    peer.expect_registration().await?;
    peer.send_raw(":irc.test 001 alice_ :Welcome").await?;

    let sent: Vec<String> = peer
        .sync()
        .await?
        .iter()
        .map(|m| m.to_string())
        .collect();
    assert_eq!(
        sent,
        vec![
            "PRIVMSG NickServ :IDENTIFY alice hunter2\r\n",
            "MODE alice_ +iw\r\n",
        ]
    );

    peer.send_raw(":alice_ MODE alice_ :+iw").await?;
    let client_state = client.clone();
    assert!(wait_until(move || client_state.state().mode_string() == "+iw").await);
    Ok(())
}
