use thiserror::Error;

use crate::domain::payment::PaymentStatus;

pub type Result<T> = std::result::Result<T, PaymentError>;

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("validation error: {0}")]
    ValidationError(String),
    #[error("payment `{0}` not found")]
    NotFound(String),
    #[error("organizer {0} has no payments on record")]
    OrganizerNotFound(u32),
    #[error("transaction id `{0}` already recorded")]
    DuplicateTransaction(String),
    #[error("payment `{id}` is {actual}, expected {expected}")]
    InvalidStateTransition {
        id: String,
        expected: PaymentStatus,
        actual: PaymentStatus,
    },
    #[error("payment `{0}` has already been released")]
    AlreadyReleased(String),
    #[error("payment `{id}` was concurrently updated to {actual}")]
    StateConflict { id: String, actual: PaymentStatus },
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for PaymentError {
    fn from(err: rocksdb::Error) -> Self {
        PaymentError::InternalError(Box::new(err))
    }
}
