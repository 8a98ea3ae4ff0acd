use thiserror::Error;

#[derive(Debug, Error)]
pub enum VendError {
    #[error("invalid vend mode: {0}")]
    InvalidMode(String),

    #[error("invalid grouping key '{0}': expected 'name' or 'id'")]
    InvalidGroupKey(String),
}

pub type Result<T> = std::result::Result<T, VendError>;
