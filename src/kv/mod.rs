//! Persistent dictionary backed by a single SQLite file.
//!
//! Each record is one row of `(key, encoded value)`. Values go through a
//! [`Serializer`] before they reach the database, and keys are matched with
//! SQLite's `GLOB` operator for the bulk operations.

mod error;
mod options;
mod serializer;
mod store;

pub use error::KvError;
pub use options::OpenOptions;
pub use serializer::{Format, Json, MessagePack, Serializer};
pub use store::{KvStore, MATCH_ALL};
