//! Open options for [`KvStore`].

use std::path::Path;
use std::time::Duration;

use super::error::KvError;
use super::serializer::{MessagePack, Serializer};
use super::store::KvStore;

/// Builder for opening a [`KvStore`] with non-default settings.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use pdict::kv::{Json, OpenOptions};
///
/// let store = OpenOptions::new()
///     .autocommit(false)
///     .busy_timeout(Duration::from_millis(250))
///     .serializer(Json)
///     .open("settings.sqlite")?;
/// # Ok::<(), pdict::kv::KvError>(())
/// ```
#[derive(Debug, Clone)]
pub struct OpenOptions<S = MessagePack> {
    pub(crate) autocommit: bool,
    pub(crate) busy_timeout: Option<Duration>,
    pub(crate) serializer: S,
}

impl OpenOptions<MessagePack> {
    /// Autocommit on, engine default busy timeout, MessagePack values.
    pub fn new() -> Self {
        Self {
            autocommit: true,
            busy_timeout: None,
            serializer: MessagePack,
        }
    }
}

impl Default for OpenOptions<MessagePack> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Serializer> OpenOptions<S> {
    /// Commit after every mutation (`true`), or leave writes pending until
    /// [`KvStore::commit`] (`false`).
    pub fn autocommit(mut self, autocommit: bool) -> Self {
        self.autocommit = autocommit;
        self
    }

    /// How long to wait on a lock held by another connection before failing.
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = Some(timeout);
        self
    }

    /// Use a different value serializer.
    pub fn serializer<T: Serializer>(self, serializer: T) -> OpenOptions<T> {
        OpenOptions {
            autocommit: self.autocommit,
            busy_timeout: self.busy_timeout,
            serializer,
        }
    }

    /// Open (creating if absent) the store file at `path`.
    pub fn open(self, path: impl AsRef<Path>) -> Result<KvStore<S>, KvError> {
        KvStore::open_with(path.as_ref(), self)
    }

    /// Open a private in-memory store. Contents vanish on close.
    pub fn open_in_memory(self) -> Result<KvStore<S>, KvError> {
        KvStore::open_in_memory_with(self)
    }
}
