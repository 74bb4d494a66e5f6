/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Persistence of the pending deadline set.
//!
//! The on-disk layout is a small YAML document:
//! ```yaml
//! version: 1
//! deadlines:
//!   7:
//!     at: 183402511
//!     silent: false
//!     label: "Tea"
//!   12:
//!     at: 183990000
//!     silent: true
//! ```
//!
//! * `label` may be absent (older files never wrote it).
//! * Loading fails soft: a missing or unreadable file yields an empty set,
//!   and a single malformed entry is skipped with a warning.
//! * Saving replaces the whole file atomically: the new document is written to
//!   a sibling temp file, flushed, then renamed over the target.

pub mod error;

pub use error::StoreError;

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::deadline::{Deadline, DeadlineSet, TimerId};

/// Current layout version written by [`FileDeadlineStore::save`].
const STATE_VERSION: u32 = 1;

// ── Store contract ────────────────────────────────────────────────────────────

/// Durable home of the [`DeadlineSet`].
pub trait DeadlineStore: Send + Sync {
    /// Returns the persisted set, or an empty one when nothing usable exists.
    fn load(&self) -> DeadlineSet;

    /// Replaces the persisted set with `set`.
    fn save(&self, set: &DeadlineSet) -> Result<(), StoreError>;

    /// Same as saving an empty set.
    fn clear(&self) -> Result<(), StoreError> {
        self.save(&DeadlineSet::new())
    }
}

// ── Private serialization types ───────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct StateFileOut<'a> {
    version: u32,
    deadlines: BTreeMap<u32, RecordOut<'a>>,
}

#[derive(Debug, Serialize)]
struct RecordOut<'a> {
    at: i64,
    silent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct RecordIn {
    at: i64,
    #[serde(default)]
    silent: bool,
    #[serde(default)]
    label: Option<String>,
}

// ── FileDeadlineStore ─────────────────────────────────────────────────────────

/// YAML file backed store.
#[derive(Debug, Clone)]
pub struct FileDeadlineStore {
    path: PathBuf,
}

impl FileDeadlineStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_err(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn write_atomically(&self, content: &str) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
            }
        }

        let tmp = self.temp_path();
        let result = (|| {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
            fs::rename(&tmp, &self.path)
        })();

        if let Err(e) = result {
            let _ = fs::remove_file(&tmp);
            return Err(self.io_err(e));
        }
        Ok(())
    }
}

impl DeadlineStore for FileDeadlineStore {
    fn load(&self) -> DeadlineSet {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no saved deadlines");
                return DeadlineSet::new();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "cannot read saved deadlines");
                return DeadlineSet::new();
            }
        };

        let set = parse_state(&content);
        info!(
            path = %self.path.display(),
            count = set.len(),
            "loaded saved deadlines"
        );
        set
    }

    fn save(&self, set: &DeadlineSet) -> Result<(), StoreError> {
        let doc = StateFileOut {
            version: STATE_VERSION,
            deadlines: set
                .iter()
                .map(|(id, d)| {
                    (
                        id.get(),
                        RecordOut {
                            at: d.at_ms,
                            silent: d.silent,
                            label: d.label.as_deref(),
                        },
                    )
                })
                .collect(),
        };
        let content = serde_yaml::to_string(&doc)?;
        self.write_atomically(&content)?;
        debug!(path = %self.path.display(), count = set.len(), "saved deadlines");
        Ok(())
    }
}

/// Decodes a state document entry by entry.
///
/// Works on the untyped YAML tree so one bad entry cannot take the rest of
/// the file down with it.
fn parse_state(content: &str) -> DeadlineSet {
    let mut set = DeadlineSet::new();

    let root: serde_yaml::Value = match serde_yaml::from_str(content) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "saved deadlines are not valid YAML, starting empty");
            return set;
        }
    };

    let entries = match root.get("deadlines") {
        Some(serde_yaml::Value::Mapping(m)) => m,
        Some(serde_yaml::Value::Null) | None => return set,
        Some(_) => {
            warn!("saved deadlines: `deadlines` is not a mapping, starting empty");
            return set;
        }
    };

    for (key, value) in entries {
        let Some(id) = parse_timer_id(key) else {
            warn!(key = ?key, "skipping saved deadline with invalid timer id");
            continue;
        };
        match serde_yaml::from_value::<RecordIn>(value.clone()) {
            Ok(rec) => {
                set.insert(id, Deadline::new(rec.at, rec.silent, rec.label));
            }
            Err(e) => {
                warn!(timer_id = %id, error = %e, "skipping malformed saved deadline");
            }
        }
    }

    set
}

fn parse_timer_id(key: &serde_yaml::Value) -> Option<TimerId> {
    let raw = match key {
        serde_yaml::Value::Number(n) => n.as_u64(),
        serde_yaml::Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }?;
    u32::try_from(raw).ok().and_then(TimerId::new)
}

// ── MemoryDeadlineStore ───────────────────────────────────────────────────────

/// Volatile store for hosts that do not persist, and for tests.
#[derive(Debug, Default)]
pub struct MemoryDeadlineStore {
    inner: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    set: DeadlineSet,
    saves: usize,
    fail_with: Option<String>,
}

impl MemoryDeadlineStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `set`, as if saved by an earlier process.
    pub fn with_set(set: DeadlineSet) -> Self {
        let store = Self::new();
        if let Ok(mut inner) = store.inner.lock() {
            inner.set = set;
        }
        store
    }

    /// Snapshot of what is currently "on disk".
    pub fn snapshot(&self) -> DeadlineSet {
        self.inner
            .lock()
            .map(|s| s.set.clone())
            .unwrap_or_default()
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.inner.lock().map(|s| s.saves).unwrap_or(0)
    }

    /// Makes every following save fail with `reason` (`None` heals it).
    pub fn set_failure(&self, reason: Option<&str>) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.fail_with = reason.map(str::to_string);
        }
    }
}

impl DeadlineStore for MemoryDeadlineStore {
    fn load(&self) -> DeadlineSet {
        self.snapshot()
    }

    fn save(&self, set: &DeadlineSet) -> Result<(), StoreError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store poisoned".into()))?;
        if let Some(reason) = &inner.fail_with {
            return Err(StoreError::Unavailable(reason.clone()));
        }
        inner.set = set.clone();
        inner.saves += 1;
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
