//! Convenient re-exports for common usage patterns.
//!
//! ```no_run
//! use pdict::prelude::*;
//!
//! let store = KvStore::builder().serializer(Json).open("app.sqlite")?;
//! store.set("settings/theme", "dark")?;
//! # Ok::<(), pdict::Error>(())
//! ```

// Unified error handling
pub use crate::error::{Error, Result};

// Store types
pub use crate::kv::{Format, Json, KvError, KvStore, MATCH_ALL, MessagePack, OpenOptions, Serializer};

// Configuration (requires "config" feature)
#[cfg(feature = "config")]
pub use crate::config::{LogFormat, LoggingConfig, StoreConfig};
