use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// VendMode
// ---------------------------------------------------------------------------

/// What a batch of bin requests is asking the hardware to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VendMode {
    OpenDoor,
    Issue,
    Return,
    Stocking,
    Physical,
}

impl VendMode {
    pub fn all() -> &'static [VendMode] {
        &[
            VendMode::OpenDoor,
            VendMode::Issue,
            VendMode::Return,
            VendMode::Stocking,
            VendMode::Physical,
        ]
    }

    /// True when stock is going into the machine rather than out of it.
    pub fn is_stocking(self) -> bool {
        matches!(
            self,
            VendMode::Physical | VendMode::Return | VendMode::Stocking
        )
    }

    /// Single-letter code stamped on transaction records.
    /// OpenDoor never records transactions and has no code.
    pub fn transaction_code(self) -> Option<&'static str> {
        match self {
            VendMode::OpenDoor => None,
            VendMode::Issue => Some("I"),
            VendMode::Return => Some("R"),
            VendMode::Stocking => Some("S"),
            VendMode::Physical => Some("P"),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VendMode::OpenDoor => "open_door",
            VendMode::Issue => "issue",
            VendMode::Return => "return",
            VendMode::Stocking => "stocking",
            VendMode::Physical => "physical",
        }
    }
}

impl fmt::Display for VendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for VendMode {
    type Err = crate::error::VendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open_door" => Ok(VendMode::OpenDoor),
            "issue" => Ok(VendMode::Issue),
            "return" => Ok(VendMode::Return),
            "stocking" => Ok(VendMode::Stocking),
            "physical" => Ok(VendMode::Physical),
            _ => Err(crate::error::VendError::InvalidMode(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// VendState
// ---------------------------------------------------------------------------

/// Terminal-state machine for one bin request: Pending until the owning
/// session reports an outcome, then Success or Failure forever.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VendState {
    #[default]
    Pending,
    Success,
    Failure,
}

impl VendState {
    pub fn is_terminal(self) -> bool {
        self != VendState::Pending
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VendState::Pending => "pending",
            VendState::Success => "success",
            VendState::Failure => "failure",
        }
    }
}

impl fmt::Display for VendState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// GroupKey
// ---------------------------------------------------------------------------

/// How the orchestrator partitions a batch into station groups.
///
/// `StationName` matches the original dispatch behavior: two stations sharing
/// a display name are driven as one group. `StationId` is the strict
/// alternative for installations where names are not unique.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKey {
    #[default]
    StationName,
    StationId,
}

impl std::str::FromStr for GroupKey {
    type Err = crate::error::VendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" | "station_name" => Ok(GroupKey::StationName),
            "id" | "station_id" => Ok(GroupKey::StationId),
            _ => Err(crate::error::VendError::InvalidGroupKey(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
