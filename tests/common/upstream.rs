//! Fake upstream IRC server.
//!
//! Accepts the bouncer's upstream connection and lets a test script both
//! sides of the conversation line by line.

use std::time::Duration;

use slirc_bouncer::Message;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpListener;
use tokio::time::timeout;

pub struct FakeUpstream {
    listener: TcpListener,
}

impl FakeUpstream {
    pub async fn bind() -> anyhow::Result<Self> {
        Ok(Self {
            listener: TcpListener::bind("127.0.0.1:0").await?,
        })
    }

    pub fn port(&self) -> u16 {
        self.listener
            .local_addr()
            .map(|addr| addr.port())
            .unwrap_or_default()
    }

    /// Accept the next upstream connection.
    pub async fn accept(&self) -> anyhow::Result<UpstreamPeer> {
        self.accept_timeout(Duration::from_secs(5)).await
    }

    pub async fn accept_timeout(&self, dur: Duration) -> anyhow::Result<UpstreamPeer> {
        let (stream, _) = timeout(dur, self.listener.accept()).await??;
        let (read_half, write_half) = stream.into_split();
        Ok(UpstreamPeer {
            reader: BufReader::new(read_half),
            writer: write_half,
            syncs: 0,
        })
    }
}

/// The server side of one upstream connection.
pub struct UpstreamPeer {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    syncs: u32,
}

impl UpstreamPeer {
    /// Send a raw line to the bouncer.
    pub async fn send_raw(&mut self, line: &str) -> anyhow::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        if !line.ends_with("\r\n") {
            self.writer.write_all(b"\r\n").await?;
        }
        self.writer.flush().await?;
        Ok(())
    }

    /// Receive one line from the bouncer.
    pub async fn recv(&mut self) -> anyhow::Result<Message> {
        let mut line = String::new();
        let n = timeout(Duration::from_secs(5), self.reader.read_line(&mut line)).await??;
        if n == 0 {
            anyhow::bail!("upstream connection closed");
        }
        line.trim_end()
            .parse::<Message>()
            .map_err(|e| anyhow::anyhow!("Parse error: {}", e))
    }

    /// Read PASS/NICK/USER.
    pub async fn expect_registration(&mut self) -> anyhow::Result<Vec<Message>> {
        let mut lines = Vec::new();
        loop {
            let msg = self.recv().await?;
            let done = msg.is_command("USER");
            lines.push(msg);
            if done {
                return Ok(lines);
            }
        }
    }

    /// Complete registration as `nick` with a standard ISUPPORT line.
    pub async fn welcome(&mut self, nick: &str) -> anyhow::Result<()> {
        self.send_raw(&format!(":irc.test 001 {} :Welcome to the test network", nick))
            .await?;
        self.send_raw(&format!(
            ":irc.test 005 {} PREFIX=(ov)@+ CHANTYPES=# CHANMODES=b,k,l,imnpst :are supported by this server",
            nick
        ))
        .await
    }

    /// Round-trip a PING so every earlier line has been applied and
    /// relayed. Returns whatever the bouncer sent before the PONG.
    pub async fn sync(&mut self) -> anyhow::Result<Vec<Message>> {
        self.syncs += 1;
        let token = format!("sync-{}", self.syncs);
        self.send_raw(&format!("PING :{}", token)).await?;

        let mut other = Vec::new();
        loop {
            let msg = self.recv().await?;
            if msg.is_command("PONG") && msg.params.iter().any(|p| p == &token) {
                return Ok(other);
            }
            other.push(msg);
        }
    }

    /// Wait until the bouncer closes the connection.
    pub async fn expect_eof(&mut self, dur: Duration) -> anyhow::Result<()> {
        let mut line = String::new();
        loop {
            line.clear();
            match timeout(dur, self.reader.read_line(&mut line)).await? {
                Ok(0) | Err(_) => return Ok(()),
                Ok(_) => continue,
            }
        }
    }
}
