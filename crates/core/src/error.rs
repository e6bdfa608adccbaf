use crate::payments::PaymentError;
use physio_email::EmailError;
use physio_types::{TextError, UuidError};

/// Every failure the booking core can produce.
///
/// Domain checks fail fast with one of these before any mutation; side-effect
/// failures (email, refund) are caught by the caller and logged instead of
/// propagated, so the primary state transition still succeeds.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid input: {0}")]
    InvalidText(#[from] TextError),
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] UuidError),
    #[error("a user with this email already exists")]
    EmailTaken,
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    InvalidState(String),
    #[error("this physiotherapist is not yet verified")]
    Unverified,
    #[error("this time slot is not available")]
    SlotConflict,
    #[error("token is invalid or has expired")]
    TokenInvalid,

    #[error("payment gateway error: {0}")]
    Payment(#[from] PaymentError),
    #[error("email error: {0}")]
    Email(#[from] EmailError),

    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to write document: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read document: {0}")]
    FileRead(std::io::Error),
    #[error("failed to serialize document: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize document: {0}")]
    Deserialization(serde_json::Error),
}

pub type BookingResult<T> = std::result::Result<T, BookingError>;
