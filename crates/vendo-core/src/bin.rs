use crate::types::VendState;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// BinRequest
// ---------------------------------------------------------------------------

/// One inventory slot to vend, stock, or return.
///
/// The caller builds the batch and owns it for its whole lifetime; the
/// orchestrator is the only thing that settles a bin's state, in response to
/// session outcome events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinRequest {
    pub id: i64,
    pub station_id: i64,
    pub station_name: String,
    /// Transport connection descriptor for the owning station
    /// (e.g. "COM3", "10.0.0.12:9100", "testrobo").
    pub station_address: String,
    /// Virtual location code shown to operators.
    #[serde(default)]
    pub virtual_code: String,
    /// Physical location code the hardware understands.
    #[serde(default)]
    pub physical_code: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub state: VendState,
}

fn default_quantity() -> u32 {
    1
}

impl BinRequest {
    pub fn new(
        id: i64,
        station_id: i64,
        station_name: impl Into<String>,
        station_address: impl Into<String>,
    ) -> Self {
        Self {
            id,
            station_id,
            station_name: station_name.into(),
            station_address: station_address.into(),
            virtual_code: String::new(),
            physical_code: String::new(),
            quantity: 1,
            state: VendState::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state == VendState::Pending
    }

    /// Move a Pending bin to a terminal outcome. Returns true if the state
    /// changed. A bin that has already settled never changes again, and
    /// Pending is not a valid outcome.
    pub fn settle(&mut self, outcome: VendState) -> bool {
        if self.state != VendState::Pending || !outcome.is_terminal() {
            return false;
        }
        self.state = outcome;
        true
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
