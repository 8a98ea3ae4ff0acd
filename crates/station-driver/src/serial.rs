use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::comms::Comms;
use crate::{DriverError, Result};

// ─── SerialComms ──────────────────────────────────────────────────────────

/// Serial link to a directly-attached station.
///
/// Descriptor parsing and framing selection live here; the raw port I/O is
/// a platform backend that plugs in behind `open()`. Until one is wired up,
/// opening reports the port as unavailable so a misconfigured installation
/// fails loudly instead of hanging a batch.
pub struct SerialComms {
    port: String,
    crlf: bool,
}

impl SerialComms {
    pub fn new(port: impl Into<String>, crlf: bool) -> Self {
        Self {
            port: port.into(),
            crlf,
        }
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    /// Whether the attached device terminates payloads with CRLF.
    pub fn uses_crlf(&self) -> bool {
        self.crlf
    }
}

#[async_trait]
impl Comms for SerialComms {
    async fn open(&mut self) -> Result<mpsc::Receiver<String>> {
        Err(DriverError::SerialUnavailable(self.port.clone()))
    }

    async fn send(&mut self, _text: &str) -> Result<()> {
        Err(DriverError::LinkClosed)
    }

    async fn close(&mut self) {}
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_reports_port_unavailable() {
        let mut comms = SerialComms::new("COM3", true);
        match comms.open().await {
            Err(DriverError::SerialUnavailable(port)) => assert_eq!(port, "COM3"),
            other => panic!("expected SerialUnavailable, got {other:?}"),
        }
    }
}
