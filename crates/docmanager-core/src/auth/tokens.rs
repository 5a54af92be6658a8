//! Durable storage for the access and refresh tokens.
//!
//! Tokens are opaque strings; an unset slot reads as the empty string.
//! Reads never fail: a storage error is logged and treated as "unset".

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use keyring::Entry;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Token file name in the data directory
const TOKEN_FILE: &str = "tokens.json";

/// Keychain service name
const SERVICE_NAME: &str = "docmanager";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    /// Storage key, shared by every backend
    pub fn key(&self) -> &'static str {
        match self {
            TokenKind::Access => "access_token",
            TokenKind::Refresh => "refresh_token",
        }
    }
}

pub trait TokenStore: Send + Sync {
    /// Current value of the slot, empty if unset
    fn get(&self, kind: TokenKind) -> String;

    /// Overwrite the slot unconditionally
    fn set(&self, kind: TokenKind, value: &str) -> Result<()>;
}

// ============================================================================
// In-memory store
// ============================================================================

/// Process-local store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    slots: Mutex<HashMap<TokenKind, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a refresh token, as left behind by a remembered login
    pub fn with_refresh_token(refresh: &str) -> Self {
        let store = Self::new();
        store
            .slots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(TokenKind::Refresh, refresh.to_string());
        store
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, kind: TokenKind) -> String {
        self.slots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }

    fn set(&self, kind: TokenKind, value: &str) -> Result<()> {
        self.slots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(kind, value.to_string());
        Ok(())
    }
}

// ============================================================================
// File store
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TokenFile {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    refresh_token: String,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl TokenFile {
    fn slot(&self, kind: TokenKind) -> &str {
        match kind {
            TokenKind::Access => &self.access_token,
            TokenKind::Refresh => &self.refresh_token,
        }
    }

    fn slot_mut(&mut self, kind: TokenKind) -> &mut String {
        match kind {
            TokenKind::Access => &mut self.access_token,
            TokenKind::Refresh => &mut self.refresh_token,
        }
    }
}

/// JSON file in the user's data directory, one file for both tokens.
pub struct FileTokenStore {
    data_dir: PathBuf,
    // Serializes read-modify-write of the file within this process
    lock: Mutex<()>,
}

impl FileTokenStore {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.data_dir.join(TOKEN_FILE)
    }

    /// When the file was last written, if it exists
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        Self::read(&self.path()).ok().and_then(|f| f.updated_at)
    }

    fn read(path: &Path) -> Result<TokenFile> {
        if !path.exists() {
            return Ok(TokenFile::default());
        }
        let contents = std::fs::read_to_string(path).context("Failed to read token file")?;
        serde_json::from_str(&contents).context("Failed to parse token file")
    }

    fn write(path: &Path, file: &TokenFile) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create token directory")?;
        }
        let contents = serde_json::to_string_pretty(file)?;
        std::fs::write(path, contents).context("Failed to write token file")?;
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self, kind: TokenKind) -> String {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        match Self::read(&self.path()) {
            Ok(file) => file.slot(kind).to_string(),
            Err(e) => {
                warn!(error = %e, key = kind.key(), "Unreadable token file, treating token as unset");
                String::new()
            }
        }
    }

    fn set(&self, kind: TokenKind, value: &str) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let path = self.path();
        // A corrupt file is replaced rather than blocking every future write
        let mut file = Self::read(&path).unwrap_or_default();
        *file.slot_mut(kind) = value.to_string();
        file.updated_at = Some(Utc::now());
        Self::write(&path, &file)?;
        debug!(key = kind.key(), empty = value.is_empty(), "Token written");
        Ok(())
    }
}

// ============================================================================
// OS keychain store
// ============================================================================

/// OS keychain store, one entry per token key.
pub struct KeyringTokenStore {
    service: String,
}

impl KeyringTokenStore {
    pub fn new() -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
        }
    }

    /// Store under a custom keychain service name (one per backend profile)
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, kind: TokenKind) -> Result<Entry> {
        Entry::new(&self.service, kind.key()).context("Failed to create keyring entry")
    }
}

impl Default for KeyringTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStore for KeyringTokenStore {
    fn get(&self, kind: TokenKind) -> String {
        let entry = match self.entry(kind) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, key = kind.key(), "Keychain unavailable, treating token as unset");
                return String::new();
            }
        };
        match entry.get_password() {
            Ok(value) => value,
            Err(keyring::Error::NoEntry) => String::new(),
            Err(e) => {
                warn!(error = %e, key = kind.key(), "Failed to read token from keychain");
                String::new()
            }
        }
    }

    fn set(&self, kind: TokenKind, value: &str) -> Result<()> {
        let entry = self.entry(kind)?;
        if value.is_empty() {
            // Empty and absent read the same; drop the entry instead of storing ""
            match entry.delete_credential() {
                Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
                Err(e) => Err(e).context("Failed to delete token from keychain"),
            }
        } else {
            entry
                .set_password(value)
                .context("Failed to store token in keychain")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_keys() {
        assert_eq!(TokenKind::Access.key(), "access_token");
        assert_eq!(TokenKind::Refresh.key(), "refresh_token");
    }

    #[test]
    fn test_memory_store_defaults_to_empty() {
        let store = MemoryTokenStore::new();
        assert_eq!(store.get(TokenKind::Access), "");
        assert_eq!(store.get(TokenKind::Refresh), "");
    }

    #[test]
    fn test_memory_store_overwrites() {
        let store = MemoryTokenStore::with_refresh_token("r1");
        assert_eq!(store.get(TokenKind::Refresh), "r1");
        store.set(TokenKind::Refresh, "r2").unwrap();
        store.set(TokenKind::Access, "a1").unwrap();
        assert_eq!(store.get(TokenKind::Refresh), "r2");
        assert_eq!(store.get(TokenKind::Access), "a1");
    }

    #[test]
    fn test_file_store_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("nested"));
        assert_eq!(store.get(TokenKind::Access), "");
        assert!(store.updated_at().is_none());
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().to_path_buf());
        store.set(TokenKind::Access, "access-1").unwrap();
        store.set(TokenKind::Refresh, "refresh-1").unwrap();
        assert!(store.updated_at().is_some());

        let reopened = FileTokenStore::new(dir.path().to_path_buf());
        assert_eq!(reopened.get(TokenKind::Access), "access-1");
        assert_eq!(reopened.get(TokenKind::Refresh), "refresh-1");

        reopened.set(TokenKind::Refresh, "").unwrap();
        assert_eq!(store.get(TokenKind::Refresh), "");
        assert_eq!(store.get(TokenKind::Access), "access-1");
    }

    #[test]
    fn test_file_store_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().to_path_buf());
        std::fs::write(store.path(), "not json").unwrap();
        assert_eq!(store.get(TokenKind::Refresh), "");

        store.set(TokenKind::Access, "fresh").unwrap();
        assert_eq!(store.get(TokenKind::Access), "fresh");
    }

    // Needs a real OS keychain (and a D-Bus secret service on Linux)
    #[test]
    #[ignore]
    fn test_keyring_store_persists_across_instances() {
        let store = KeyringTokenStore::with_service("docmanager-test");
        store.set(TokenKind::Access, "access-1").unwrap();

        let reopened = KeyringTokenStore::with_service("docmanager-test");
        assert_eq!(reopened.get(TokenKind::Access), "access-1");

        reopened.set(TokenKind::Access, "").unwrap();
        assert_eq!(store.get(TokenKind::Access), "");
    }
}
