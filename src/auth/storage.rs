//! Durable client-side storage for session fields.
//!
//! The session persists three independent string entries: the access token,
//! the refresh token, and the serialized user profile. Any entry may be
//! absent without affecting the others, and removing one never touches the
//! rest - that independence is what lets a reload rehydrate exactly the
//! state that was last written.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use keyring::Entry;

/// Keys for the three persisted session entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKey {
    AccessToken,
    RefreshToken,
    Profile,
}

impl SessionKey {
    pub fn name(self) -> &'static str {
        match self {
            SessionKey::AccessToken => "access_token",
            SessionKey::RefreshToken => "refresh_token",
            SessionKey::Profile => "user",
        }
    }
}

/// Key/value storage for session entries, surviving process restart.
pub trait SessionStorage: Send + Sync {
    fn load(&self, key: SessionKey) -> Result<Option<String>>;
    fn store(&self, key: SessionKey, value: &str) -> Result<()>;
    fn remove(&self, key: SessionKey) -> Result<()>;
}

/// File-backed storage: one file per entry under a directory.
///
/// The directory is created on first write.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn entry_path(&self, key: SessionKey) -> PathBuf {
        self.dir.join(key.name())
    }
}

impl SessionStorage for FileStorage {
    fn load(&self, key: SessionKey) -> Result<Option<String>> {
        let path = self.entry_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read session entry {}", key.name()))?;
        Ok(Some(contents))
    }

    fn store(&self, key: SessionKey, value: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir).context("Failed to create session directory")?;
        std::fs::write(self.entry_path(key), value)
            .with_context(|| format!("Failed to write session entry {}", key.name()))?;
        Ok(())
    }

    fn remove(&self, key: SessionKey) -> Result<()> {
        let path = self.entry_path(key);
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove session entry {}", key.name()))?;
        }
        Ok(())
    }
}

/// OS keychain storage: one keychain credential per entry.
pub struct KeyringStorage {
    service: String,
}

impl KeyringStorage {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: SessionKey) -> Result<Entry> {
        Entry::new(&self.service, key.name()).context("Failed to create keyring entry")
    }
}

impl SessionStorage for KeyringStorage {
    fn load(&self, key: SessionKey) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to read session entry from keychain"),
        }
    }

    fn store(&self, key: SessionKey, value: &str) -> Result<()> {
        self.entry(key)?
            .set_password(value)
            .context("Failed to store session entry in keychain")
    }

    fn remove(&self, key: SessionKey) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete session entry from keychain"),
        }
    }
}

/// In-memory storage for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<SessionKey, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

impl SessionStorage for MemoryStorage {
    fn load(&self, key: SessionKey) -> Result<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(&key).cloned())
    }

    fn store(&self, key: SessionKey, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key, value.to_string());
        Ok(())
    }

    fn remove(&self, key: SessionKey) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(&key);
        Ok(())
    }
}
