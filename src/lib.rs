//! A persistent dictionary backed by a single SQLite file.
//!
//! pdict stores arbitrary `serde` values under string keys. Keys can be
//! matched with shell-style globs (`*`, `?`, `[...]`) to list, read or
//! delete a whole namespace at once, and a matched subset of the store can
//! be exported as one blob and loaded into another store.
//!
//! # Quick Start
//!
//! ```no_run
//! use pdict::prelude::*;
//!
//! let store = KvStore::open("test.sqlite")?;
//! let key = format!("test/{}", store.generate_key());
//!
//! store.set(&key, &("a", 1))?;
//! assert_eq!(store.keys("test/*")?.len(), 1);
//!
//! let blob = store.dump::<(String, i32)>("test/*")?;
//! store.delete("test/*")?;
//! store.load::<(String, i32)>(&blob)?;
//! # Ok::<(), pdict::Error>(())
//! ```
//!
//! # Modules
//!
//! - [`kv`] - The store, its open options and value serializers
//! - [`config`] - TOML configuration (requires `config` feature)
//! - [`error`] - Unified error type
//! - [`prelude`] - Convenient re-exports
//!
//! # Feature Flags
//!
//! - `config` - TOML configuration files (enabled by default)
//! - `logging` - Enable library-level tracing (consumers provide their own subscriber)
//! - `cli` - Enable the `pdict` command-line binary
//! - `full` - Enable all features

#[cfg(feature = "config")]
pub mod config;
pub mod error;
pub mod kv;
mod logging;
pub mod prelude;
#[cfg(feature = "cli")]
pub mod subscriber;

// Re-export the unified error type
pub use error::{Error, Result};

// Re-export KV types at crate root for convenience
pub use kv::{Format, Json, KvError, KvStore, MATCH_ALL, MessagePack, OpenOptions, Serializer};

#[cfg(feature = "config")]
pub use config::StoreConfig;
