//! Core domain for vendo: bin requests and their terminal-state machine,
//! conversation command logs, and the pure protocol step functions that
//! decide what a device session does next. No I/O and no async — everything
//! here is unit-testable in isolation; `station-driver` supplies transports,
//! timing, and orchestration.

pub mod bin;
pub mod error;
pub mod log;
pub mod protocol;
pub mod types;

pub use bin::BinRequest;
pub use error::{Result, VendError};
pub use log::{CommandLog, CommandRecord};
pub use protocol::{Milestone, Protocol, ProtocolAction, Robo500};
pub use types::{GroupKey, VendMode, VendState};
