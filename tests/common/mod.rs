//! Common test utilities and fixtures.
//!
//! Shared value types and a temporary-directory wrapper so every test gets
//! its own store file.

#![allow(dead_code)]

use std::path::PathBuf;
use std::time::Duration;

use pdict::kv::{KvStore, OpenOptions};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

// =============================================================================
// Value Types
// =============================================================================

/// Simple record used as a stored value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// Nested record with optional and collection fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    pub age: u8,
    pub email: Option<String>,
    pub tags: Vec<String>,
}

pub fn person(name: &str, age: u8) -> Person {
    Person {
        name: name.to_string(),
        age,
        email: None,
        tags: vec!["test".to_string()],
    }
}

// =============================================================================
// Test Store Files
// =============================================================================

/// A temporary directory holding one store file path.
pub struct TestDir {
    pub path: PathBuf,
    _temp_dir: TempDir, // Keep alive for test duration
}

impl TestDir {
    /// Create a fresh directory; the store file itself does not exist yet.
    pub fn new() -> anyhow::Result<Self> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("store.sqlite");
        Ok(Self {
            path,
            _temp_dir: temp_dir,
        })
    }

    /// Open the store with default options.
    pub fn open(&self) -> anyhow::Result<KvStore> {
        Ok(KvStore::open(&self.path)?)
    }

    /// Open the store with autocommit off.
    pub fn open_manual(&self) -> anyhow::Result<KvStore> {
        Ok(OpenOptions::new()
            .autocommit(false)
            .busy_timeout(Duration::ZERO)
            .open(&self.path)?)
    }

    /// Open the store without waiting on locks held elsewhere.
    pub fn open_impatient(&self) -> anyhow::Result<KvStore> {
        Ok(OpenOptions::new()
            .busy_timeout(Duration::ZERO)
            .open(&self.path)?)
    }
}
