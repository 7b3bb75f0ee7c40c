//! Unified error type for the pdict library.
//!
//! [`Error`] wraps the store's [`KvError`] together with the configuration
//! and I/O failures that appear around it, so an application can use one
//! error type end to end.

use thiserror::Error;

#[cfg(feature = "config")]
use crate::config::ConfigError;
use crate::kv::KvError;

/// Unified error type for all pdict operations.
///
/// # Example
///
/// ```no_run
/// use pdict::{KvStore, Result};
///
/// fn remember(name: &str) -> Result<()> {
///     let store = KvStore::open("names.sqlite")?;
///     store.set(&format!("names/{}", store.generate_key()), name)?;
///     Ok(())
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// Error from key-value store operations.
    #[error(transparent)]
    Kv(#[from] KvError),

    /// Error loading the configuration file.
    #[cfg(feature = "config")]
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// I/O error outside the database (reading or writing dump files).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A [`Result`] type alias using the unified [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns `true` if this is a KV store error.
    pub fn is_kv(&self) -> bool {
        matches!(self, Self::Kv(_))
    }

    /// Returns `true` if a strict lookup missed.
    pub fn is_key_not_found(&self) -> bool {
        matches!(self, Self::Kv(KvError::KeyNotFound(_)))
    }

    /// Returns `true` if this is a configuration error.
    #[cfg(feature = "config")]
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns `true` if this is an I/O error.
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kv_errors_convert() {
        let err: Error = KvError::KeyNotFound("a".into()).into();
        assert!(err.is_kv());
        assert!(err.is_key_not_found());
        assert_eq!(err.to_string(), "Key not found: a");
    }

    #[test]
    fn test_io_errors_convert() {
        let err: Error = std::io::Error::other("disk gone").into();
        assert!(err.is_io());
        assert!(!err.is_kv());
    }
}
