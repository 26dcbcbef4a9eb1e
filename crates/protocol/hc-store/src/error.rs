//! Storage errors.

use hc_types::ChannelId;
use hc_wire::{DecodeError, EncodeError};
use thiserror::Error;

/// Result alias used throughout the store.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Why a store operation failed.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// I/O error while preparing the database location.
    #[error("database location: {0}")]
    Io(#[from] std::io::Error),

    /// SQLite rejected a statement.
    #[error("sqlite: {0}")]
    Database(#[from] rusqlite::Error),

    /// A stored snapshot or set of terms failed to decode.
    #[error("stored record failed to decode: {0}")]
    Decode(#[from] DecodeError),

    /// A snapshot or set of terms failed to encode.
    #[error("record failed to encode: {0}")]
    Encode(#[from] EncodeError),

    /// No channel with this identifier.
    #[error("channel not found: {0}")]
    ChannelNotFound(ChannelId),

    /// The database layout is not one this build can use.
    #[error("schema: {0}")]
    Schema(String),

    /// A row holds values no channel could have.
    #[error("corrupt record: {0}")]
    InvalidData(String),

    /// A thread panicked while holding the connection.
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}

impl StoreError {
    pub fn schema(msg: impl Into<String>) -> Self {
        StoreError::Schema(msg.into())
    }

    pub fn invalid_data(msg: impl Into<String>) -> Self {
        StoreError::InvalidData(msg.into())
    }

    pub fn lock_poisoned(msg: impl Into<String>) -> Self {
        StoreError::LockPoisoned(msg.into())
    }
}
