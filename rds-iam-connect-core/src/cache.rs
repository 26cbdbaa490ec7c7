//! Per-environment cache of discovered clusters.
//!
//! Each environment scope owns one JSON snapshot file
//! (`rds-clusters-cache-<scope>.json`) inside `~/.rds-iam-connect`. Reads
//! never fail: anything unexpected about the file, its contents or the
//! configured duration is logged at debug level and treated as a miss, so
//! discovery always has a way forward. Writes replace the whole snapshot
//! through a temporary file and an atomic rename.

use crate::config::{self, CacheSettings};
use crate::error::{RdsConnectError, Result};
use crate::models::{CacheSnapshot, ConnectionTarget};
use chrono::{DateTime, Utc};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Returns the snapshot file name for an environment scope.
pub fn cache_file_name(scope: &str) -> String {
    format!("rds-clusters-cache-{}.json", scope)
}

/// Parses a cache duration such as `24h`, `30m`, `1h 30m` or `1d`.
pub fn parse_cache_duration(
    duration: &str,
) -> std::result::Result<Duration, humantime::DurationError> {
    humantime::parse_duration(duration.trim())
}

/// State of a scope's snapshot file on disk, as reported by check mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheFileStatus {
    /// Caching is turned off in the configuration
    Disabled,
    /// No usable cache directory (no home directory or invalid scope name)
    Unavailable,
    /// No snapshot has been written for the scope
    Missing,
    /// A snapshot file exists for the scope
    Present,
    /// Something other than a regular file sits at the snapshot path
    NotRegularFile,
}

/// File-per-scope snapshot store with time-based expiry.
#[derive(Debug, Clone)]
pub struct CacheStore {
    enabled: bool,
    duration: String,
    directory: Option<PathBuf>,
}

impl CacheStore {
    /// Creates a store rooted at the per-user application directory.
    ///
    /// A missing home directory leaves the store without a location: loads
    /// miss and saves report an error.
    pub fn new(settings: &CacheSettings) -> Self {
        let directory = match config::app_dir() {
            Ok(dir) => Some(dir),
            Err(e) => {
                debug!("Cache directory unavailable: {}", e);
                None
            }
        };
        Self {
            enabled: settings.enabled,
            duration: settings.duration.clone(),
            directory,
        }
    }

    /// Creates a store rooted at an explicit directory.
    pub fn with_directory(settings: &CacheSettings, directory: impl Into<PathBuf>) -> Self {
        Self {
            enabled: settings.enabled,
            duration: settings.duration.clone(),
            directory: Some(directory.into()),
        }
    }

    /// Whether caching is turned on.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Directory holding the snapshot files, if one could be resolved.
    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    /// Resolves the snapshot path for a scope, confined to the cache directory.
    pub fn snapshot_path(&self, scope: &str) -> Option<PathBuf> {
        let directory = self.directory.as_ref()?;
        if !is_valid_scope(scope) {
            debug!("Invalid cache scope name: {:?}", scope);
            return None;
        }
        let path = directory.join(cache_file_name(scope));
        if path.parent() != Some(directory.as_path()) {
            debug!("Invalid cache file path: {}", path.display());
            return None;
        }
        Some(path)
    }

    /// Loads a scope's targets if a valid, unexpired snapshot exists.
    ///
    /// `None` is a miss for any reason.
    pub fn load(&self, scope: &str) -> Option<Vec<ConnectionTarget>> {
        self.load_at(scope, Utc::now())
    }

    /// [`load`](Self::load) evaluated at a fixed instant.
    pub fn load_at(&self, scope: &str, now: DateTime<Utc>) -> Option<Vec<ConnectionTarget>> {
        if !self.enabled {
            debug!("Cache is disabled");
            return None;
        }

        let path = self.snapshot_path(scope)?;
        let metadata = match fs::symlink_metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) => {
                debug!("Cache file not found or inaccessible: {}", e);
                return None;
            }
        };
        if !metadata.is_file() {
            debug!("Cache file is not a regular file: {}", path.display());
            return None;
        }

        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) => {
                debug!("Failed to read cache file: {}", e);
                return None;
            }
        };
        let snapshot: CacheSnapshot = match serde_json::from_slice(&data) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                debug!("Failed to parse cache data: {}", e);
                return None;
            }
        };

        let duration = match parse_cache_duration(&self.duration) {
            Ok(duration) => duration,
            Err(e) => {
                debug!(
                    "Invalid cache duration format '{}' (e.g. '24h', '30m', '1d'): {}",
                    self.duration, e
                );
                return None;
            }
        };

        if is_expired(&snapshot, duration, now) {
            debug!(
                "Cache is expired. Cache timestamp: {}, current time: {}, duration: {}",
                snapshot.captured_at,
                now,
                self.duration
            );
            return None;
        }

        debug!(
            "Loaded {} clusters from cache for environment {}",
            snapshot.targets.len(),
            scope
        );
        Some(snapshot.targets)
    }

    /// Replaces a scope's snapshot with `targets`, stamped with the current time.
    pub fn save(&self, scope: &str, targets: &[ConnectionTarget]) -> Result<()> {
        self.save_at(scope, targets, Utc::now())
    }

    /// [`save`](Self::save) with an explicit capture time.
    pub fn save_at(
        &self,
        scope: &str,
        targets: &[ConnectionTarget],
        captured_at: DateTime<Utc>,
    ) -> Result<()> {
        if !self.enabled {
            debug!("Cache is disabled, skipping save");
            return Ok(());
        }

        let directory = self
            .directory
            .as_deref()
            .ok_or_else(|| RdsConnectError::cache("cache directory", "home directory not found"))?;
        let path = self.snapshot_path(scope).ok_or_else(|| {
            RdsConnectError::cache(
                format!("cache file for scope {:?}", scope),
                "scope name does not map to a file in the cache directory",
            )
        })?;

        config::ensure_private_dir(directory)
            .map_err(|e| RdsConnectError::cache("failed to create cache directory", e))?;

        let snapshot = CacheSnapshot {
            captured_at,
            targets: targets.to_vec(),
        };
        let data = serde_json::to_vec_pretty(&snapshot).map_err(|e| RdsConnectError::Serialization {
            context: "cache snapshot".to_string(),
            source: e,
        })?;

        // NamedTempFile is created 0600, so the renamed snapshot is owner-only.
        let mut temp = tempfile::NamedTempFile::new_in(directory)
            .map_err(|e| RdsConnectError::cache("failed to create temporary cache file", e))?;
        temp.write_all(&data)
            .and_then(|()| temp.as_file().sync_all())
            .map_err(|e| RdsConnectError::cache("failed to write cache file", e))?;
        temp.persist(&path)
            .map_err(|e| RdsConnectError::cache("failed to replace cache file", e))?;

        debug!(
            "Saved {} clusters to cache for environment {}: {}",
            targets.len(),
            scope,
            path.display()
        );
        Ok(())
    }

    /// Deletes a scope's snapshot. Returns whether a file was removed.
    pub fn invalidate(&self, scope: &str) -> Result<bool> {
        let Some(path) = self.snapshot_path(scope) else {
            return Ok(false);
        };
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("Removed cache file {}", path.display());
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(RdsConnectError::cache("failed to remove cache file", e)),
        }
    }

    /// Reports what is on disk for a scope without reading the snapshot.
    pub fn inspect(&self, scope: &str) -> CacheFileStatus {
        if !self.enabled {
            return CacheFileStatus::Disabled;
        }
        let Some(path) = self.snapshot_path(scope) else {
            return CacheFileStatus::Unavailable;
        };
        match fs::symlink_metadata(&path) {
            Ok(metadata) if metadata.is_file() => CacheFileStatus::Present,
            Ok(_) => CacheFileStatus::NotRegularFile,
            Err(_) => CacheFileStatus::Missing,
        }
    }
}

/// Scope names become part of a file name and may not navigate directories.
fn is_valid_scope(scope: &str) -> bool {
    !scope.is_empty()
        && scope
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && !scope.starts_with('.')
}

/// A snapshot is valid while strictly younger than `duration`.
fn is_expired(snapshot: &CacheSnapshot, duration: Duration, now: DateTime<Utc>) -> bool {
    if snapshot.captured_at > now {
        return true;
    }
    let Ok(window) = chrono::Duration::from_std(duration) else {
        return true;
    };
    now.signed_duration_since(snapshot.captured_at) >= window
}
