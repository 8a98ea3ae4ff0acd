use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::comms::Comms;
use crate::{DriverError, Result};

// ─── TcpComms ─────────────────────────────────────────────────────────────

/// Socket link to a networked station. Inbound data is newline-framed: a
/// background reader task forwards each line into the inbound channel until
/// the peer disconnects or the link is closed.
pub struct TcpComms {
    host: String,
    port: u16,
    crlf: bool,
    writer: Option<OwnedWriteHalf>,
    reader: Option<JoinHandle<()>>,
}

impl TcpComms {
    pub fn new(host: impl Into<String>, port: u16, crlf: bool) -> Self {
        Self {
            host: host.into(),
            port,
            crlf,
            writer: None,
            reader: None,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

#[async_trait]
impl Comms for TcpComms {
    async fn open(&mut self) -> Result<mpsc::Receiver<String>> {
        let stream = TcpStream::connect((self.host.as_str(), self.port)).await?;
        let (read_half, write_half) = stream.into_split();
        self.writer = Some(write_half);

        let (tx, rx) = mpsc::channel(32);
        self.reader = Some(tokio::spawn(async move {
            let mut lines = BufReader::new(read_half).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if tx.send(line).await.is_err() {
                    break; // session gone
                }
            }
        }));

        Ok(rx)
    }

    async fn send(&mut self, text: &str) -> Result<()> {
        let writer = self.writer.as_mut().ok_or(DriverError::LinkClosed)?;
        writer.write_all(text.as_bytes()).await?;
        writer
            .write_all(if self.crlf { b"\r\n" } else { b"\n" })
            .await?;
        writer.flush().await?;
        Ok(())
    }

    async fn close(&mut self) {
        self.writer.take();
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
