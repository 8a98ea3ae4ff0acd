//! `station-driver` — drives vending/stocking hardware conversations and
//! orchestrates batches of bin requests across stations.
//!
//! # Architecture
//!
//! ```text
//! run_batch(bins, mode)
//!     │  groups Pending bins by station, one group at a time
//!     ▼
//! resolve_station     ← name-keyed lookup; comms from the connection
//!     │                 descriptor (COM* serial, host:port socket, test*)
//!     ▼
//! VendingMachine      ← consumes itself into one session actor task
//!     │                 (command log + watchdog + protocol step function,
//!     │                  serialized in a single select loop)
//!     ▼
//! SessionHandle       ← futures::Stream of SessionEvent over mpsc;
//!     │                 Success/Failure reports, then exactly one Complete
//!     ▼
//! run_batch settles bin states, records transactions, picks the next group
//! ```
//!
//! The protocol step functions themselves live in `vendo-core` and are pure;
//! everything timed or I/O-shaped is here.

pub mod comms;
pub mod events;
pub mod factory;
pub mod recorder;
pub mod runner;
pub mod serial;
pub mod session;
pub mod sim;
pub mod supervisor;
pub mod tcp;

mod error;

pub use comms::Comms;
pub use error::DriverError;
pub use events::{SessionEvent, SessionHandle};
pub use factory::{classify, resolve_comms, resolve_station, TransportKind, WatchdogConfig};
pub use recorder::{JsonlRecorder, NoopRecorder, TransactionRecorder};
pub use runner::{run_batch, BatchSummary, VendOptions};
pub use session::{
    ImmediateSuccessMachine, StructuredMachine, TimeoutOnlyMachine, UnconfiguredMachine,
    VendingMachine,
};
pub use supervisor::Watchdog;

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, DriverError>;
