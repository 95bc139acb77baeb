// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Semtable contributors
//! Persistence adapter - durable context snapshots with expiry
//!
//! The adapter never lets a storage failure escape: quota errors, corrupt
//! payloads, and missing entries all collapse to "nothing stored".

use crate::state::ContextState;
use crate::types::{Semester, UserRole};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Primary storage key for the serialized context snapshot
pub const CONTEXT_KEY: &str = "school-schedule-context";
/// Secondary key holding the bare user role for quick access
pub const USER_ROLE_KEY: &str = "school-schedule-user-role";

/// Stored snapshots older than this are discarded on load
const STORED_CONTEXT_TTL_HOURS: i64 = 24;

/// Error raised by a storage backend; absorbed inside this module
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying file I/O failed
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    /// Stored payload could not be parsed
    #[error("storage parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A namespaced string key-value store, the durable-storage seam.
///
/// Implementations may fail; the [`ContextStore`] built on top treats every
/// failure as "nothing stored".
pub trait KeyValueStorage: Send {
    /// Read the value stored under `key`, if any
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    /// Write `value` under `key`, replacing any previous value
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    /// Remove `key`; succeeds whether or not it was present
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// The durable snapshot of a context selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredContext {
    /// Selected year at save time
    pub current_year: Option<i32>,
    /// Selected semester record at save time
    pub current_semester: Option<Semester>,
    /// Role of the user who made the selection
    #[serde(default)]
    pub user_role: UserRole,
    /// When the snapshot was written; drives the 24 h expiry
    pub timestamp: DateTime<Utc>,
}

// =============================================================================
// File-backed storage
// =============================================================================

/// Key-value storage persisted as a single JSON map on disk
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Storage file kept inside the data directory
    const FILE_NAME: &'static str = "context-store.json";

    /// Create a store backed by `<data_dir>/context-store.json`
    #[must_use]
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(Self::FILE_NAME),
        }
    }

    fn read_map(&self) -> Result<HashMap<String, String>, StorageError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn write_map(&self, map: &HashMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(map)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_map()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut map = self.read_map()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        let mut map = self.read_map()?;
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }
}

// =============================================================================
// In-memory storage
// =============================================================================

/// In-memory key-value storage for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryStorage {
    map: HashMap<String, String>,
    /// When set, every write fails; exercises the absorb-all-errors contract
    pub fail_writes: bool,
}

impl MemoryStorage {
    /// Create an empty in-memory store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw entry, bypassing the adapter (for expiry/corruption tests)
    pub fn seed(&mut self, key: &str, value: &str) {
        self.map.insert(key.to_string(), value.to_string());
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.map.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::Io(std::io::Error::other("write disabled")));
        }
        self.map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.map.remove(key);
        Ok(())
    }
}

// =============================================================================
// Context store
// =============================================================================

/// Persistence adapter for the context snapshot
pub struct ContextStore {
    storage: Box<dyn KeyValueStorage>,
}

impl ContextStore {
    /// Wrap a key-value storage backend
    #[must_use]
    pub fn new(storage: Box<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }

    /// Serialize the current selection to storage.
    ///
    /// Returns whether the write succeeded; failures are logged, never
    /// propagated.
    pub fn save(&mut self, state: &ContextState) -> bool {
        let snapshot = StoredContext {
            current_year: state.current_year(),
            current_semester: state.current_semester().cloned(),
            user_role: state.user_role,
            timestamp: Utc::now(),
        };

        let payload = match serde_json::to_string(&snapshot) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(%err, "failed to serialize context snapshot");
                return false;
            }
        };

        if let Err(err) = self.storage.set(CONTEXT_KEY, &payload) {
            warn!(%err, "failed to save context snapshot");
            return false;
        }
        if let Err(err) = self.storage.set(USER_ROLE_KEY, state.user_role.as_str()) {
            warn!(%err, "failed to save user role");
        }

        debug!("context snapshot saved");
        true
    }

    /// Load the stored snapshot, if one exists and is still fresh.
    ///
    /// Expired or malformed snapshots are deleted as a side effect and
    /// reported as absent.
    pub fn load(&mut self) -> Option<StoredContext> {
        let raw = match self.storage.get(CONTEXT_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!(%err, "failed to read stored context");
                return None;
            }
        };

        let snapshot: StoredContext = match serde_json::from_str(&raw) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(%err, "stored context is malformed, clearing");
                self.clear();
                return None;
            }
        };

        let age = Utc::now() - snapshot.timestamp;
        if age > Duration::hours(STORED_CONTEXT_TTL_HOURS) {
            debug!("stored context expired, clearing");
            self.clear();
            return None;
        }

        Some(snapshot)
    }

    /// Remove the stored snapshot; idempotent
    pub fn clear(&mut self) -> bool {
        match self.storage.remove(CONTEXT_KEY) {
            Ok(()) => true,
            Err(err) => {
                warn!(%err, "failed to clear stored context");
                false
            }
        }
    }

    /// Whether a raw snapshot entry exists, without expiry checks
    pub fn has_stored(&self) -> bool {
        matches!(self.storage.get(CONTEXT_KEY), Ok(Some(_)))
    }

    #[cfg(test)]
    fn storage_ref(&self) -> &dyn KeyValueStorage {
        self.storage.as_ref()
    }
}
