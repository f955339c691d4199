//! Persistence adapter for taskmaster
//!
//! The core never talks to storage directly. State is kept under four keys
//! in a [`KeyValueStore`]:
//!
//! ```text
//! taskmaster_users          # [UserRecord]   (bare names accepted)
//! taskmaster_tasks          # [TaskRecord]
//! taskmaster_currentUser    # "name"
//! taskmaster_settings       # {theme, language, autoSave, notifications}
//! ```
//!
//! [`Persistence`] wraps a store and never lets a storage failure escape:
//! errors are logged and turned into defaults (on load) or `false` (on save),
//! so the in-memory model stays the source of truth for the session.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::lock::{self, FileLock, DEFAULT_LOCK_TIMEOUT_MS};
use crate::task::TaskRecord;
use crate::user::UserRecord;

/// Storage keys
pub mod keys {
    pub const PREFIX: &str = "taskmaster_";

    pub const USERS: &str = "taskmaster_users";
    pub const TASKS: &str = "taskmaster_tasks";
    pub const CURRENT_USER: &str = "taskmaster_currentUser";
    pub const SETTINGS: &str = "taskmaster_settings";

    pub const ALL: [&str; 4] = [USERS, TASKS, CURRENT_USER, SETTINGS];
}

/// Minimal key-value contract the application persists through
pub trait KeyValueStore {
    /// Stored value for `key`, or `None` if the key was never written
    fn load(&self, key: &str) -> Result<Option<Value>>;

    fn save(&mut self, key: &str, value: &Value) -> Result<()>;

    /// Delete `key`, returning whether it existed
    fn remove(&mut self, key: &str) -> Result<bool>;

    /// Every key currently stored, sorted
    fn keys(&self) -> Result<Vec<String>>;
}

fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-');
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidArgument(format!("invalid storage key '{key}'")))
    }
}

// =========================================================================
// File-backed store
// =========================================================================

/// One `<key>.json` file per key inside a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    lock_timeout_ms: u64,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
        }
    }

    pub fn with_lock_timeout(mut self, timeout_ms: u64) -> Self {
        self.lock_timeout_ms = timeout_ms;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn lock_path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.lock"))
    }

    /// Check that the directory exists and is writable
    pub fn is_available(&self) -> bool {
        let probe = self.dir.join(".probe");
        let writable = fs::create_dir_all(&self.dir)
            .and_then(|_| fs::write(&probe, b"probe"))
            .is_ok();
        let _ = fs::remove_file(&probe);
        writable
    }
}

impl KeyValueStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<Value>> {
        validate_key(key)?;
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn save(&mut self, key: &str, value: &Value) -> Result<()> {
        validate_key(key)?;
        let _lock = FileLock::acquire(self.lock_path_for(key), self.lock_timeout_ms)?;
        let json = serde_json::to_string_pretty(value)?;
        lock::write_atomic(self.path_for(key), json.as_bytes())
    }

    fn remove(&mut self, key: &str) -> Result<bool> {
        validate_key(key)?;
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(false);
        }
        let _lock = FileLock::acquire(self.lock_path_for(key), self.lock_timeout_ms)?;
        fs::remove_file(&path)?;
        Ok(true)
    }

    fn keys(&self) -> Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                if validate_key(stem).is_ok() {
                    keys.push(stem.to_string());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}

// =========================================================================
// In-memory store
// =========================================================================

/// Process-local store. Values are kept serialized, like browser storage,
/// and the store can be switched into a failing mode.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
    failing: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every call fails, as when storage is disabled or full
    pub fn unavailable() -> Self {
        Self {
            entries: BTreeMap::new(),
            failing: true,
        }
    }

    pub fn set_failing(&mut self, failing: bool) {
        self.failing = failing;
    }

    /// Store raw text under `key`, bypassing serialization
    pub fn insert_raw(&mut self, key: &str, raw: &str) {
        self.entries.insert(key.to_string(), raw.to_string());
    }

    pub fn raw(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    fn check(&self) -> Result<()> {
        if self.failing {
            return Err(Error::Storage("storage unavailable".to_string()));
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<Value>> {
        self.check()?;
        match self.entries.get(key) {
            Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
            None => Ok(None),
        }
    }

    fn save(&mut self, key: &str, value: &Value) -> Result<()> {
        self.check()?;
        self.entries
            .insert(key.to_string(), serde_json::to_string(value)?);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<bool> {
        self.check()?;
        Ok(self.entries.remove(key).is_some())
    }

    fn keys(&self) -> Result<Vec<String>> {
        self.check()?;
        Ok(self.entries.keys().cloned().collect())
    }
}

// =========================================================================
// Settings and export bundle
// =========================================================================

/// Application settings. Unknown fields are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_true")]
    pub auto_save: bool,
    #[serde(default = "default_true")]
    pub notifications: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_theme() -> String {
    "light".to_string()
}

fn default_language() -> String {
    "pl".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            language: default_language(),
            auto_save: true,
            notifications: true,
            extra: Map::new(),
        }
    }
}

impl Settings {
    /// Set one field from text. Unknown keys are stored as extra values,
    /// parsed as JSON when possible.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "theme" => self.theme = value.to_string(),
            "language" => self.language = value.to_string(),
            "autoSave" | "auto_save" | "auto-save" => self.auto_save = parse_flag(key, value)?,
            "notifications" => self.notifications = parse_flag(key, value)?,
            other if other.trim().is_empty() => {
                return Err(Error::InvalidArgument("setting key cannot be empty".to_string()));
            }
            other => {
                let parsed = serde_json::from_str(value)
                    .unwrap_or_else(|_| Value::String(value.to_string()));
                self.extra.insert(other.to_string(), parsed);
            }
        }
        Ok(())
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        _ => Err(Error::InvalidArgument(format!(
            "setting '{key}' expects true or false, got '{value}'"
        ))),
    }
}

/// Everything under the application keys, as raw JSON
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportBundle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_user: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Value>,
}

// =========================================================================
// Persistence wrapper
// =========================================================================

/// Typed, failure-isolating access to a [`KeyValueStore`]
#[derive(Debug, Clone)]
pub struct Persistence<S> {
    store: S,
}

impl<S: KeyValueStore> Persistence<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    /// Raw value for `key`; storage errors are logged and read as absent
    pub fn load_value(&self, key: &str) -> Option<Value> {
        match self.store.load(key) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(key, error = %err, "failed to load from storage; using default");
                None
            }
        }
    }

    /// Typed value for `key`, or `default` when missing, unreadable or malformed
    pub fn load_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        let Some(value) = self.load_value(key) else {
            return default;
        };
        match serde_json::from_value(value) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::warn!(
                    key,
                    error = %err,
                    "stored value has unexpected shape; using default"
                );
                default
            }
        }
    }

    /// Serialize and store `value`. Returns false (and logs) on failure.
    pub fn save<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> bool {
        let result = serde_json::to_value(value)
            .map_err(Error::from)
            .and_then(|value| self.store.save(key, &value));
        match result {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(key, error = %err, "failed to save; changes are not durable");
                false
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> bool {
        match self.store.remove(key) {
            Ok(_) => true,
            Err(err) => {
                tracing::warn!(key, error = %err, "failed to remove key");
                false
            }
        }
    }

    /// Elements of the array under `key` that parse as `T`; bad entries are skipped
    fn load_list<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        match self.load_value(key) {
            Some(value) => parse_list(key, value),
            None => Vec::new(),
        }
    }

    pub fn load_users(&self) -> Vec<UserRecord> {
        self.load_list(keys::USERS)
    }

    pub fn save_users(&mut self, users: &[UserRecord]) -> bool {
        self.save(keys::USERS, users)
    }

    pub fn load_tasks(&self) -> Vec<TaskRecord> {
        self.load_list(keys::TASKS)
    }

    pub fn save_tasks(&mut self, tasks: &[TaskRecord]) -> bool {
        self.save(keys::TASKS, tasks)
    }

    pub fn load_current_user(&self) -> Option<String> {
        self.load_or::<Option<String>>(keys::CURRENT_USER, None)
    }

    /// Store the current user name; `None` clears the key
    pub fn save_current_user(&mut self, name: Option<&str>) -> bool {
        match name {
            Some(name) => self.save(keys::CURRENT_USER, name),
            None => self.remove(keys::CURRENT_USER),
        }
    }

    pub fn load_settings(&self) -> Settings {
        self.load_or(keys::SETTINGS, Settings::default())
    }

    pub fn save_settings(&mut self, settings: &Settings) -> bool {
        self.save(keys::SETTINGS, settings)
    }

    pub fn export_all(&self) -> ExportBundle {
        ExportBundle {
            users: self.load_value(keys::USERS),
            tasks: self.load_value(keys::TASKS),
            current_user: self.load_value(keys::CURRENT_USER),
            settings: self.load_value(keys::SETTINGS),
        }
    }

    /// Write every section present in `bundle`. True only if all writes succeed.
    pub fn import_all(&mut self, bundle: &ExportBundle) -> bool {
        let sections = [
            (keys::USERS, &bundle.users),
            (keys::TASKS, &bundle.tasks),
            (keys::CURRENT_USER, &bundle.current_user),
            (keys::SETTINGS, &bundle.settings),
        ];
        let mut ok = true;
        for (key, value) in sections {
            if let Some(value) = value {
                ok &= self.save(key, value);
            }
        }
        ok
    }

    pub fn clear_all(&mut self) -> bool {
        let mut ok = true;
        for key in keys::ALL {
            ok &= self.remove(key);
        }
        ok
    }

    /// Approximate bytes used by `taskmaster_` keys (key + serialized value)
    pub fn app_storage_size(&self) -> usize {
        let stored = match self.store.keys() {
            Ok(stored) => stored,
            Err(err) => {
                tracing::warn!(error = %err, "failed to list storage keys");
                return 0;
            }
        };
        stored
            .iter()
            .filter(|key| key.starts_with(keys::PREFIX))
            .filter_map(|key| {
                let value = self.load_value(key)?;
                let raw = serde_json::to_string(&value).ok()?;
                Some(key.len() + raw.len())
            })
            .sum()
    }
}

/// Elements of a JSON array that parse as `T`. Bad entries are skipped and
/// anything but an array yields nothing.
pub fn parse_list<T: DeserializeOwned>(key: &str, value: Value) -> Vec<T> {
    let Value::Array(items) = value else {
        tracing::warn!(key, "stored value is not a list; ignoring");
        return Vec::new();
    };
    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value(item) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                tracing::warn!(key, index, error = %err, "skipping unreadable entry");
                None
            }
        })
        .collect()
}

/// Human-readable byte count, e.g. `1.5 KB`
pub fn format_size(bytes: usize) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}
