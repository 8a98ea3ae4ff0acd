use thiserror::Error;
use vendo_core::VendMode;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("comms could not be found for address: {0}")]
    CommsNotConfigured(String),

    #[error("the IP address or port is malformed: {0}")]
    MalformedAddress(String),

    #[error("no serial backend is available for port {0}")]
    SerialUnavailable(String),

    #[error("vend mode {0} has not been implemented")]
    UnsupportedMode(VendMode),

    #[error("comms link is closed")]
    LinkClosed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
