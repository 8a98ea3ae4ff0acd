use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::comms::Comms;
use crate::{DriverError, Result};

// ─── SilentComms ──────────────────────────────────────────────────────────

/// Simulated link that accepts every command and never answers. Keeps the
/// inbound channel open so a session waits on data that will never come —
/// the watchdog path's natural habitat.
pub struct SilentComms {
    inbound: Option<mpsc::Sender<String>>,
}

impl SilentComms {
    pub fn new() -> Self {
        Self { inbound: None }
    }
}

impl Default for SilentComms {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Comms for SilentComms {
    async fn open(&mut self) -> Result<mpsc::Receiver<String>> {
        let (tx, rx) = mpsc::channel(8);
        self.inbound = Some(tx);
        Ok(rx)
    }

    async fn send(&mut self, _text: &str) -> Result<()> {
        if self.inbound.is_none() {
            return Err(DriverError::LinkClosed);
        }
        Ok(())
    }

    async fn close(&mut self) {
        self.inbound.take();
    }
}

// ─── ScriptedRoboComms ────────────────────────────────────────────────────

/// Simulated Robo500 unit: answers each command the way the hardware does
/// on the happy path. After unlocking, the "operator" opens the door and
/// then shuts it again, so both vend and stocking conversations run to
/// their milestone.
pub struct ScriptedRoboComms {
    inbound: Option<mpsc::Sender<String>>,
}

impl ScriptedRoboComms {
    pub fn new() -> Self {
        Self { inbound: None }
    }

    fn replies_to(text: &str) -> &'static [&'static str] {
        if text == "RDS" {
            &["DC"]
        } else if text == "RCS" {
            &["CC"]
        } else if text.contains("FET") {
            &["MC"]
        } else if text.contains("LON") {
            &["DO", "DC"]
        } else {
            &[]
        }
    }
}

impl Default for ScriptedRoboComms {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Comms for ScriptedRoboComms {
    async fn open(&mut self) -> Result<mpsc::Receiver<String>> {
        let (tx, rx) = mpsc::channel(32);
        self.inbound = Some(tx);
        Ok(rx)
    }

    async fn send(&mut self, text: &str) -> Result<()> {
        let tx = self.inbound.as_ref().ok_or(DriverError::LinkClosed)?;
        for reply in Self::replies_to(text) {
            let _ = tx.send((*reply).to_string()).await;
        }
        Ok(())
    }

    async fn close(&mut self) {
        self.inbound.take();
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
