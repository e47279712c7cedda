//! Persisted user preferences.
//!
//! The only state that survives a restart. Stored as a versioned binary
//! envelope next to the rest of the app data, written atomically
//! (temp-then-rename) so a crash mid-write never corrupts the file. Another
//! process writing the same file is picked up through
//! `apply_external_change`, which the host calls from whatever file-change
//! notification the platform offers.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::constants::PREFERENCES_FILE;
use crate::models::UserPreferences;

/// Increment whenever the schema of `UserPreferences` changes in a way that
/// would make old files unreadable. Old envelopes are silently discarded and
/// defaults used.
pub const PREFS_SCHEMA_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct PrefsEnvelope {
    schema_version: u32,
    /// Unix seconds when this envelope was written.
    saved_at: u64,
    prefs: UserPreferences,
}

/// Error type for preference persistence operations
#[derive(Debug)]
pub enum PreferenceStoreError {
    /// Failed to read the preferences file
    ReadError(String),
    /// Failed to parse the preferences file
    ParseError(String),
    /// Failed to write the preferences file
    WriteError(String),
}

impl std::fmt::Display for PreferenceStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PreferenceStoreError::ReadError(e) => write!(f, "Failed to read preferences: {}", e),
            PreferenceStoreError::ParseError(e) => write!(f, "Failed to parse preferences: {}", e),
            PreferenceStoreError::WriteError(e) => write!(f, "Failed to save preferences: {}", e),
        }
    }
}

impl std::error::Error for PreferenceStoreError {}

pub struct PreferenceStore {
    path: PathBuf,
    current: UserPreferences,
    saved_at: u64,
    next_subscriber_id: u64,
    subscribers: Vec<(u64, Box<dyn FnMut(&UserPreferences)>)>,
    last_error: Option<PreferenceStoreError>,
}

impl PreferenceStore {
    pub fn prefs_path(data_dir: &Path) -> PathBuf {
        data_dir.join(PREFERENCES_FILE)
    }

    /// Open the store, loading the persisted preferences if a readable,
    /// current-schema file exists, defaults otherwise. Load failures are
    /// remembered in `last_error` rather than surfaced.
    pub fn open(data_dir: &Path) -> Self {
        let path = Self::prefs_path(data_dir);
        let (current, saved_at, last_error) = match Self::load_envelope(&path) {
            Ok(Some(envelope)) => (envelope.prefs, envelope.saved_at, None),
            Ok(None) => (UserPreferences::default(), 0, None),
            Err(e) => {
                tracing::warn!(error = %e, "falling back to default preferences");
                (UserPreferences::default(), 0, Some(e))
            }
        };

        Self {
            path,
            current,
            saved_at,
            next_subscriber_id: 0,
            subscribers: Vec::new(),
            last_error,
        }
    }

    fn load_envelope(path: &Path) -> Result<Option<PrefsEnvelope>, PreferenceStoreError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(PreferenceStoreError::ReadError(e.to_string())),
        };

        let envelope: PrefsEnvelope = bincode::deserialize(&bytes)
            .map_err(|e| PreferenceStoreError::ParseError(e.to_string()))?;

        if envelope.schema_version != PREFS_SCHEMA_VERSION {
            tracing::info!(
                cached = envelope.schema_version,
                current = PREFS_SCHEMA_VERSION,
                "preferences schema version mismatch - discarding"
            );
            return Ok(None);
        }

        Ok(Some(envelope))
    }

    pub fn get(&self) -> &UserPreferences {
        &self.current
    }

    /// Mutate the preferences, persist them, and notify subscribers.
    pub fn update(
        &mut self,
        f: impl FnOnce(&mut UserPreferences),
    ) -> Result<(), PreferenceStoreError> {
        f(&mut self.current);
        self.save()?;
        self.notify_subscribers();
        Ok(())
    }

    fn save(&mut self) -> Result<(), PreferenceStoreError> {
        let saved_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let envelope = PrefsEnvelope {
            schema_version: PREFS_SCHEMA_VERSION,
            saved_at,
            prefs: self.current.clone(),
        };

        let bytes = bincode::serialize(&envelope)
            .map_err(|e| PreferenceStoreError::WriteError(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| PreferenceStoreError::WriteError(e.to_string()))?;
        }

        let temp_file = self.path.with_extension("bin.tmp");
        fs::write(&temp_file, &bytes)
            .map_err(|e| PreferenceStoreError::WriteError(e.to_string()))?;
        fs::rename(&temp_file, &self.path)
            .map_err(|e| PreferenceStoreError::WriteError(e.to_string()))?;

        self.saved_at = saved_at;
        Ok(())
    }

    /// Re-read the file after an external change notification. Returns true
    /// when a newer envelope was adopted; subscribers are notified then.
    pub fn apply_external_change(&mut self) -> bool {
        match Self::load_envelope(&self.path) {
            Ok(Some(envelope)) if envelope.saved_at > self.saved_at => {
                self.current = envelope.prefs;
                self.saved_at = envelope.saved_at;
                self.notify_subscribers();
                true
            }
            Ok(_) => false,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable external preference change");
                self.last_error = Some(e);
                false
            }
        }
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&UserPreferences) + 'static) -> u64 {
        let id = self.next_subscriber_id;
        self.next_subscriber_id += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    pub fn unsubscribe(&mut self, id: u64) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub_id, _)| *sub_id != id);
        self.subscribers.len() != before
    }

    pub fn last_error(&self) -> Option<&PreferenceStoreError> {
        self.last_error.as_ref()
    }

    fn notify_subscribers(&mut self) {
        let current = self.current.clone();
        for (_, callback) in &mut self.subscribers {
            callback(&current);
        }
    }
}
