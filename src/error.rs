use crate::domain::money::Amount;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, ShopError>;

/// Error taxonomy shared by the stores, the payment pipeline and the wizard
/// engine. The dispatch layer maps each kind to user-facing text in one place.
#[derive(Error, Debug)]
pub enum ShopError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid field: {0}")]
    InvalidField(String),
    #[error("duplicate payload {0}")]
    DuplicatePayload(String),
    #[error("payload {0} already consumed")]
    AlreadyConsumed(String),
    #[error("amount mismatch: reserved {reserved}, got {actual}")]
    AmountMismatch { reserved: Amount, actual: Amount },
    #[error("unknown payload {0}")]
    UnknownPayload(String),
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
    #[error("cart is empty")]
    EmptyCart,
    #[error("no active wizard for user {0}")]
    NoActiveSession(i64),
    #[error("validation failed: {0}")]
    ValidationFailed(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("event decode error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for ShopError {
    fn from(e: rocksdb::Error) -> Self {
        Self::Storage(e.to_string())
    }
}
