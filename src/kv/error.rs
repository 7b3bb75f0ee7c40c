//! Error types for the KV store module.

use rusqlite::ErrorCode;
use thiserror::Error;

/// Errors that can occur during KV store operations.
#[derive(Error, Debug)]
pub enum KvError {
    /// The backing SQLite file could not be created, opened, read or written.
    ///
    /// Every engine-reported failure (I/O, corruption, a lock held by another
    /// connection) lands here.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[from] rusqlite::Error),

    /// A strict lookup found no row for the exact key.
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// A value could not be encoded, or stored bytes could not be decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl KvError {
    /// Create a serialization error from anything displayable.
    pub fn serialization(err: impl std::fmt::Display) -> Self {
        Self::Serialization(err.to_string())
    }

    /// Returns `true` if another connection holds a lock that blocked this one.
    pub fn is_locked(&self) -> bool {
        match self {
            Self::StorageUnavailable(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }

    /// Returns `true` if this is a missing-key error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::KeyNotFound(_))
    }
}
