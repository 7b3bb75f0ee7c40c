//! KV Store implementation using SQLite.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::logging::{debug, error, info, trace, warn};

use super::error::KvError;
use super::options::OpenOptions;
use super::serializer::{MessagePack, Serializer};

/// Pattern matching every key.
pub const MATCH_ALL: &str = "*";

/// Table holding every record. Columns carry no declared type.
const TABLE: &str = "entries";

const CREATE_TABLE: &str = "CREATE TABLE entries (entry_key, entry_value)";
const SELECT_TABLE: &str = "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1";
const SELECT_KEYS: &str = "SELECT entry_key FROM entries WHERE entry_key GLOB ?1";
const SELECT_VALUE: &str = "SELECT entry_value FROM entries WHERE entry_key = ?1 LIMIT 1";
const SELECT_EXISTS: &str = "SELECT 1 FROM entries WHERE entry_key = ?1 LIMIT 1";
const SELECT_ITEMS: &str = "SELECT entry_key, entry_value FROM entries WHERE entry_key GLOB ?1";
const COUNT_MATCHING: &str = "SELECT COUNT(*) FROM entries WHERE entry_key GLOB ?1";
const INSERT_VALUE: &str = "INSERT INTO entries (entry_key, entry_value) VALUES (?1, ?2)";
const UPDATE_VALUE: &str = "UPDATE entries SET entry_value = ?2 WHERE entry_key = ?1";
const DELETE_EXACT: &str = "DELETE FROM entries WHERE entry_key = ?1";
const DELETE_MATCHING: &str = "DELETE FROM entries WHERE entry_key GLOB ?1";

/// A persistent dictionary backed by one SQLite file.
///
/// Values are any `serde` type; they are encoded by the store's
/// [`Serializer`] and kept as opaque bytes next to their key. Keys are plain
/// strings, usually namespaced with `/` (for example `"users/" + uuid`), and
/// the bulk operations ([`keys`](Self::keys), [`items`](Self::items),
/// [`delete`](Self::delete), [`dump`](Self::dump)) take a shell-style glob:
/// `*` matches any run of characters, `?` one character, `[...]` a class.
///
/// # Example
///
/// ```no_run
/// use pdict::KvStore;
///
/// let store = KvStore::open("test.sqlite")?;
/// let key = format!("test/{}", store.generate_key());
///
/// store.set(&key, &vec![1, 2, 3])?;
/// assert_eq!(store.get::<Vec<i32>>(&key)?, Some(vec![1, 2, 3]));
/// assert_eq!(store.keys("test/*")?.len(), 1);
///
/// store.delete("test/*")?;
/// assert!(!store.contains(&key)?);
/// # Ok::<(), pdict::kv::KvError>(())
/// ```
///
/// # Transactions
///
/// With autocommit on (the default) every mutation is committed before the
/// call returns. With autocommit off the first mutation opens a transaction
/// that stays open until [`commit`](Self::commit) or
/// [`rollback`](Self::rollback); its writes are visible through this store
/// only, and are discarded if the store is closed first.
///
/// # Concurrency
///
/// One store owns one connection and is not `Sync`. Several stores (in one
/// process or many) may open the same file; SQLite's file locks serialize
/// their writers, and a writer that cannot get the lock within the busy
/// timeout fails with [`KvError::StorageUnavailable`].
pub struct KvStore<S = MessagePack> {
    conn: Connection,
    path: Option<PathBuf>,
    autocommit: bool,
    serializer: S,
}

impl KvStore<MessagePack> {
    /// Open the store at `path` with autocommit on and MessagePack values.
    ///
    /// The file and its table are created if the path does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, KvError> {
        OpenOptions::new().open(path)
    }

    /// Open a private in-memory store with default options.
    pub fn open_in_memory() -> Result<Self, KvError> {
        OpenOptions::new().open_in_memory()
    }

    /// Start configuring a store; finish with [`OpenOptions::open`].
    pub fn builder() -> OpenOptions<MessagePack> {
        OpenOptions::new()
    }
}

impl<S: Serializer> KvStore<S> {
    pub(crate) fn open_with(path: &Path, options: OpenOptions<S>) -> Result<Self, KvError> {
        debug!(path = %path.display(), autocommit = options.autocommit, "opening store");

        // Existence must be checked before connecting: SQLite creates the file.
        let create_table = !path.exists();

        let conn = Connection::open(path).map_err(|e| {
            error!(path = %path.display(), error = %e, "failed to open store");
            KvError::from(e)
        })?;

        let store = Self::from_connection(conn, Some(path.to_path_buf()), options)?;
        if create_table {
            store.create_table()?;
        } else {
            store.check_table()?;
        }

        info!(
            path = %path.display(),
            created = create_table,
            serializer = store.serializer.name(),
            "store opened"
        );
        Ok(store)
    }

    pub(crate) fn open_in_memory_with(options: OpenOptions<S>) -> Result<Self, KvError> {
        let conn = Connection::open_in_memory()?;
        let store = Self::from_connection(conn, None, options)?;
        store.create_table()?;
        debug!(serializer = store.serializer.name(), "in-memory store opened");
        Ok(store)
    }

    fn from_connection(
        conn: Connection,
        path: Option<PathBuf>,
        options: OpenOptions<S>,
    ) -> Result<Self, KvError> {
        if let Some(timeout) = options.busy_timeout {
            conn.busy_timeout(timeout)?;
        }
        Ok(Self {
            conn,
            path,
            autocommit: options.autocommit,
            serializer: options.serializer,
        })
    }

    fn create_table(&self) -> Result<(), KvError> {
        // Runs outside any transaction, so the schema is committed on return.
        self.conn.execute_batch(CREATE_TABLE)?;
        trace!(table = TABLE, "table created");
        Ok(())
    }

    /// Reads the schema, which fails early on files that are not databases.
    fn check_table(&self) -> Result<(), KvError> {
        let found = self
            .conn
            .query_row(SELECT_TABLE, params![TABLE], |_| Ok(()))
            .optional()?;
        if found.is_none() {
            warn!(table = TABLE, "existing file has no store table");
        }
        Ok(())
    }

    /// Filesystem path of the backing file, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Whether mutations commit immediately.
    pub fn autocommit(&self) -> bool {
        self.autocommit
    }

    /// The serializer used for values.
    pub fn serializer(&self) -> &S {
        &self.serializer
    }

    /// Returns `true` if uncommitted writes are pending on this connection.
    pub fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    /// A fresh random UUID string, meant to be joined to a namespace prefix.
    ///
    /// Does not touch the database.
    pub fn generate_key(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Every key matching the glob `pattern`, in no particular order.
    ///
    /// The whole result is collected in memory.
    pub fn keys(&self, pattern: &str) -> Result<Vec<String>, KvError> {
        let mut stmt = self.conn.prepare_cached(SELECT_KEYS)?;
        let keys = stmt
            .query_map(params![pattern], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        debug!(pattern = pattern, count = keys.len(), "listed keys");
        Ok(keys)
    }

    /// Number of keys matching the glob `pattern`.
    pub fn len(&self, pattern: &str) -> Result<usize, KvError> {
        let count: i64 = self
            .conn
            .prepare_cached(COUNT_MATCHING)?
            .query_row(params![pattern], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Returns `true` if no key matches the glob `pattern`.
    pub fn is_empty(&self, pattern: &str) -> Result<bool, KvError> {
        Ok(self.len(pattern)? == 0)
    }

    /// Returns `true` if a row exists for exactly `key`.
    ///
    /// The stored value is not decoded, so a row holding a nil value still
    /// counts as present.
    pub fn contains(&self, key: &str) -> Result<bool, KvError> {
        row_exists(&self.conn, key)
    }

    /// Value stored under exactly `key`, or `None` if there is no such row.
    pub fn get<V: DeserializeOwned>(&self, key: &str) -> Result<Option<V>, KvError> {
        trace!(key = key, "getting value");
        let bytes = self
            .conn
            .prepare_cached(SELECT_VALUE)?
            .query_row(params![key], |row| value_bytes(row, 0))
            .optional()?;

        bytes.map(|b| self.serializer.decode(&b)).transpose()
    }

    /// Value stored under exactly `key`, failing with
    /// [`KvError::KeyNotFound`] if there is no such row.
    pub fn get_exact<V: DeserializeOwned>(&self, key: &str) -> Result<V, KvError> {
        self.get(key)?
            .ok_or_else(|| KvError::KeyNotFound(key.to_string()))
    }

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// A value that encodes to nil (`None`, `()`) deletes the key instead;
    /// nil is never written.
    pub fn set<V: Serialize + ?Sized>(&self, key: &str, value: &V) -> Result<(), KvError> {
        let encoded = self.serializer.encode(value)?;
        let nil = self.serializer.is_nil(&encoded);
        self.write(|conn| put(conn, key, &encoded, nil))
    }

    /// Remove every key matching the glob `pattern`.
    ///
    /// Returns how many rows were removed; matching nothing is not an error.
    pub fn delete(&self, pattern: &str) -> Result<usize, KvError> {
        let removed = self.write(|conn| {
            Ok(conn
                .prepare_cached(DELETE_MATCHING)?
                .execute(params![pattern])?)
        })?;
        debug!(pattern = pattern, removed = removed, "deleted keys");
        Ok(removed)
    }

    /// Every `(key, value)` pair whose key matches the glob `pattern`, in no
    /// particular order.
    ///
    /// The whole result is collected in memory.
    pub fn items<V: DeserializeOwned>(&self, pattern: &str) -> Result<Vec<(String, V)>, KvError> {
        let rows = self.raw_items(pattern)?;
        let items = rows
            .into_iter()
            .map(|(key, bytes)| self.serializer.decode(&bytes).map(|value| (key, value)))
            .collect::<Result<Vec<_>, KvError>>()?;
        debug!(pattern = pattern, count = items.len(), "listed items");
        Ok(items)
    }

    /// Snapshot of every pair matching `pattern`, encoded as one blob.
    ///
    /// Values are decoded as `V` and re-encoded together as a
    /// `key -> value` map, so the blob can be read back with
    /// [`load`](Self::load) by any store using the same serializer. Stores
    /// holding mixed value types can dump as `serde_json::Value` when the
    /// serializer is self-describing.
    pub fn dump<V>(&self, pattern: &str) -> Result<Vec<u8>, KvError>
    where
        V: DeserializeOwned + Serialize,
    {
        let snapshot: BTreeMap<String, V> = self.items(pattern)?.into_iter().collect();
        let blob = self.serializer.encode(&snapshot)?;
        info!(
            pattern = pattern,
            count = snapshot.len(),
            blob_len = blob.len(),
            "dumped store"
        );
        Ok(blob)
    }

    /// Write every entry of a blob made by [`dump`](Self::dump).
    ///
    /// Entries are applied like [`set`](Self::set), in key order and as one
    /// write, so existing keys are overwritten and nil entries delete their
    /// key. Keys missing from the blob are left alone. Returns the number of
    /// entries applied.
    pub fn load<V>(&self, blob: &[u8]) -> Result<usize, KvError>
    where
        V: DeserializeOwned + Serialize,
    {
        let entries: BTreeMap<String, Option<V>> = self.serializer.decode(blob)?;
        let encoded = entries
            .iter()
            .map(|(key, value)| {
                let bytes = self.serializer.encode(value)?;
                let nil = self.serializer.is_nil(&bytes);
                Ok::<_, KvError>((key.as_str(), bytes, nil))
            })
            .collect::<Result<Vec<_>, KvError>>()?;

        self.write(|conn| {
            for (key, bytes, nil) in &encoded {
                put(conn, key, bytes, *nil)?;
            }
            Ok(())
        })?;
        info!(count = entries.len(), "loaded blob");
        Ok(entries.len())
    }

    /// Commit pending writes. Does nothing if none are pending.
    pub fn commit(&self) -> Result<(), KvError> {
        if self.in_transaction() {
            self.conn.execute_batch("COMMIT")?;
            debug!("transaction committed");
        }
        Ok(())
    }

    /// Discard pending writes. Does nothing if none are pending.
    pub fn rollback(&self) -> Result<(), KvError> {
        if self.in_transaction() {
            self.conn.execute_batch("ROLLBACK")?;
            debug!("transaction rolled back");
        }
        Ok(())
    }

    /// Close the connection. Uncommitted writes are discarded.
    pub fn close(self) -> Result<(), KvError> {
        if self.in_transaction() {
            warn!("closing store with uncommitted writes");
        }
        self.conn.close().map_err(|(_, e)| KvError::from(e))?;
        trace!("store closed");
        Ok(())
    }

    /// Run one mutation under the store's commit policy.
    fn write<T>(&self, op: impl FnOnce(&Connection) -> Result<T, KvError>) -> Result<T, KvError> {
        if self.autocommit {
            let tx = self.conn.unchecked_transaction()?;
            let conn: &Connection = &tx;
            let out = op(conn)?;
            tx.commit()?;
            Ok(out)
        } else {
            if self.conn.is_autocommit() {
                self.conn.execute_batch("BEGIN")?;
                trace!("transaction opened");
            }
            op(&self.conn)
        }
    }

    fn raw_items(&self, pattern: &str) -> Result<Vec<(String, Vec<u8>)>, KvError> {
        let mut stmt = self.conn.prepare_cached(SELECT_ITEMS)?;
        let rows = stmt
            .query_map(params![pattern], |row| {
                Ok((row.get::<_, String>(0)?, value_bytes(row, 1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

impl<S> std::fmt::Debug for KvStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvStore")
            .field("path", &self.path)
            .field("autocommit", &self.autocommit)
            .finish_non_exhaustive()
    }
}

/// Insert, update or remove one row. Nil removes the key and is never stored.
fn put(conn: &Connection, key: &str, encoded: &[u8], nil: bool) -> Result<(), KvError> {
    let present = row_exists(conn, key)?;
    match (present, nil) {
        (true, true) => {
            conn.prepare_cached(DELETE_EXACT)?.execute(params![key])?;
            debug!(key = key, "nil value, key removed");
        }
        (true, false) => {
            conn.prepare_cached(UPDATE_VALUE)?
                .execute(params![key, encoded])?;
            debug!(key = key, value_len = encoded.len(), "value updated");
        }
        (false, false) => {
            conn.prepare_cached(INSERT_VALUE)?
                .execute(params![key, encoded])?;
            debug!(key = key, value_len = encoded.len(), "value inserted");
        }
        (false, true) => {
            trace!(key = key, "nil value for absent key ignored");
        }
    }
    Ok(())
}

fn row_exists(conn: &Connection, key: &str) -> Result<bool, KvError> {
    Ok(conn
        .prepare_cached(SELECT_EXISTS)?
        .query_row(params![key], |_| Ok(()))
        .optional()?
        .is_some())
}

/// Value column as bytes, whether SQLite holds it as a blob or as text.
fn value_bytes(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<u8>> {
    match row.get_ref(idx)? {
        ValueRef::Blob(bytes) | ValueRef::Text(bytes) => Ok(bytes.to_vec()),
        other => Err(rusqlite::Error::InvalidColumnType(
            idx,
            "entry_value".to_string(),
            other.data_type(),
        )),
    }
}
