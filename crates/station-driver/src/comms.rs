use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::Result;

// ─── Comms ────────────────────────────────────────────────────────────────

/// A command/response link to one station's device.
///
/// Payloads are delivered whole, one per channel message, in arrival order;
/// framing (newlines, CRLF) is the implementation's business. Sessions are
/// the only callers: they open the link once, send protocol replies, and
/// close on teardown.
#[async_trait]
pub trait Comms: Send {
    /// Open the link and return the inbound payload channel.
    async fn open(&mut self) -> Result<mpsc::Receiver<String>>;

    /// Transmit one command payload.
    async fn send(&mut self, text: &str) -> Result<()>;

    /// Tear the link down. Idempotent.
    async fn close(&mut self);
}
