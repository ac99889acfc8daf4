//! Disk cache for fetched content trees.
//!
//! Pulling a large Notion workspace takes one or more HTTP round trips per
//! page, so repeated local builds can reuse the record maps of the previous
//! run. The cache is a plain directory of JSON files, one per key:
//!
//! ```text
//! .cache/
//! ├── notion-db.json          # the container page
//! └── posts/
//!     ├── 1f0c….json          # one file per post, keyed by page id
//!     └── …
//! ```
//!
//! # Design
//!
//! The cache is never correctness-critical. It fails open in every direction:
//!
//! - A missing, unreadable or unparseable entry reads as absent, so the caller
//!   refetches and overwrites it.
//! - A failed write is logged and swallowed; the build continues with the
//!   freshly computed value.
//! - There is no eviction and no locking. Concurrent writers to the same key
//!   race and the last one wins, which is fine because every writer stores an
//!   equivalent value.
//!
//! ## Disabled mode
//!
//! The cache is off by default (`CACHE=1`, `--cache` or `[cache] enabled`
//! turn it on). A disabled cache behaves as if it were always empty: every
//! `get` misses, and `set`, `delete` and `clear` do nothing. Callers never
//! branch on the mode themselves.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{debug, warn};

/// Extension of every cache entry file.
const ENTRY_EXTENSION: &str = "json";

/// A key → JSON value store rooted at one directory.
#[derive(Debug)]
pub struct FileCache {
    dir: PathBuf,
    enabled: bool,
    hits: AtomicU32,
    misses: AtomicU32,
    writes: AtomicU32,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>, enabled: bool) -> Self {
        Self {
            dir: dir.into(),
            enabled,
            hits: AtomicU32::new(0),
            misses: AtomicU32::new(0),
            writes: AtomicU32::new(0),
        }
    }

    /// A cache that never stores anything.
    pub fn disabled() -> Self {
        Self::new(PathBuf::new(), false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`.
    ///
    /// Characters outside `[A-Za-z0-9_-]` are replaced so a key can never
    /// address a file outside the cache directory.
    pub fn entry_path(&self, key: &str) -> PathBuf {
        let file_stem: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{file_stem}.{ENTRY_EXTENSION}"))
    }

    /// Read a cached value. Absent, unreadable and corrupt entries all
    /// return `None`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if !self.enabled {
            return None;
        }
        let value = std::fs::read_to_string(self.entry_path(key))
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok());
        match value {
            Some(v) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key, "cache hit");
                Some(v)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(key, "cache miss");
                None
            }
        }
    }

    /// Store a value. Failures are logged and otherwise ignored.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) {
        if !self.enabled {
            return;
        }
        let path = self.entry_path(key);
        let result = std::fs::create_dir_all(&self.dir)
            .map_err(|e| e.to_string())
            .and_then(|()| serde_json::to_string(value).map_err(|e| e.to_string()))
            .and_then(|json| std::fs::write(&path, json).map_err(|e| e.to_string()));
        match result {
            Ok(()) => {
                self.writes.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => warn!(path = %path.display(), error = %e, "failed to write cache entry"),
        }
    }

    /// Return the cached value for `key`, or run `compute` and store its
    /// result. An `Err` from `compute` is returned as-is and nothing is
    /// stored.
    pub fn get_or_compute<T, E, F>(&self, key: &str, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(cached) = self.get(key) {
            return Ok(cached);
        }
        let value = compute()?;
        self.set(key, &value);
        Ok(value)
    }

    pub fn has(&self, key: &str) -> bool {
        self.enabled && self.entry_path(key).is_file()
    }

    pub fn delete(&self, key: &str) {
        if !self.enabled {
            return;
        }
        let path = self.entry_path(key);
        if let Err(e) = std::fs::remove_file(&path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!(path = %path.display(), error = %e, "failed to delete cache entry");
        }
    }

    /// Remove every entry in this cache's directory. Subdirectories (other
    /// namespaces) are left alone. Returns the number of entries removed.
    pub fn clear(&self) -> usize {
        if !self.enabled {
            return 0;
        }
        let Ok(read_dir) = std::fs::read_dir(&self.dir) else {
            return 0;
        };
        let mut removed = 0;
        for entry in read_dir.flatten() {
            let path = entry.path();
            let is_entry = path.is_file()
                && path.extension().and_then(|e| e.to_str()) == Some(ENTRY_EXTENSION);
            if !is_entry {
                continue;
            }
            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to delete cache entry")
                }
            }
        }
        removed
    }

    /// Snapshot of the hit/miss counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
        }
    }
}

/// Cache performance for a build run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub misses: u32,
    pub writes: u32,
}

impl CacheStats {
    pub fn total(&self) -> u32 {
        self.hits + self.misses
    }
}

impl std::ops::Add for CacheStats {
    type Output = CacheStats;

    fn add(self, other: CacheStats) -> CacheStats {
        CacheStats {
            hits: self.hits + other.hits,
            misses: self.misses + other.misses,
            writes: self.writes + other.writes,
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits > 0 {
            write!(
                f,
                "{} cached, {} fetched ({} total)",
                self.hits,
                self.misses,
                self.total()
            )
        } else {
            write!(f, "{} fetched", self.misses)
        }
    }
}
