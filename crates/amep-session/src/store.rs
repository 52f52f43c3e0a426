//! Durable storage for the access/refresh token pair.
//!
//! The session layer treats storage as two named string slots. Each call
//! is atomic on its own; there is no transaction across the two slots.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use amep_protocol::{Codec, JsonCodec};
use serde::{Deserialize, Serialize};

use crate::StoreError;

// ---------------------------------------------------------------------------
// TokenSlot
// ---------------------------------------------------------------------------

/// One of the two persisted credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenSlot {
    /// Short-lived token sent with every authenticated request.
    AccessToken,
    /// Longer-lived token used only to mint new access tokens.
    RefreshToken,
}

impl TokenSlot {
    /// Both slots, in the order they are written on login.
    pub const ALL: [TokenSlot; 2] = [TokenSlot::AccessToken, TokenSlot::RefreshToken];

    /// The storage key: `access_token` or `refresh_token`.
    pub fn key(self) -> &'static str {
        match self {
            TokenSlot::AccessToken => "access_token",
            TokenSlot::RefreshToken => "refresh_token",
        }
    }
}

impl fmt::Display for TokenSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

// ---------------------------------------------------------------------------
// TokenStore
// ---------------------------------------------------------------------------

/// Client-durable key-value storage for tokens.
///
/// Methods are synchronous and run directly on the async worker thread,
/// inside `SessionManager`'s credential lock (a `std::sync::Mutex`), so
/// tokens and the published user change together. A call blocks that
/// worker and every other session operation until it returns. Keep
/// implementations to fast local storage (memory, a small file); a store
/// backed by anything slower should hand its work to
/// `tokio::task::spawn_blocking` behind a cache rather than block here.
pub trait TokenStore: Send + Sync + 'static {
    /// Reads a slot. `Ok(None)` means the slot is empty.
    fn get(&self, slot: TokenSlot) -> Result<Option<String>, StoreError>;

    /// Writes a slot, replacing any previous value.
    fn set(&self, slot: TokenSlot, value: &str) -> Result<(), StoreError>;

    /// Clears a slot. Clearing an empty slot is not an error.
    fn remove(&self, slot: TokenSlot) -> Result<(), StoreError>;
}

impl<T: TokenStore> TokenStore for Arc<T> {
    fn get(&self, slot: TokenSlot) -> Result<Option<String>, StoreError> {
        (**self).get(slot)
    }

    fn set(&self, slot: TokenSlot, value: &str) -> Result<(), StoreError> {
        (**self).set(slot, value)
    }

    fn remove(&self, slot: TokenSlot) -> Result<(), StoreError> {
        (**self).remove(slot)
    }
}

/// Locks a std mutex, recovering the data if a previous holder panicked.
/// Token slots hold plain strings, so there is no torn state to protect.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// MemoryTokenStore
// ---------------------------------------------------------------------------

/// In-process token store. Tokens are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    slots: Mutex<HashMap<TokenSlot, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-populated with both tokens, as if a previous run had
    /// logged in.
    pub fn with_tokens(access_token: &str, refresh_token: &str) -> Self {
        let store = Self::new();
        {
            let mut slots = lock(&store.slots);
            slots.insert(TokenSlot::AccessToken, access_token.to_string());
            slots.insert(TokenSlot::RefreshToken, refresh_token.to_string());
        }
        store
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, slot: TokenSlot) -> Result<Option<String>, StoreError> {
        Ok(lock(&self.slots).get(&slot).cloned())
    }

    fn set(&self, slot: TokenSlot, value: &str) -> Result<(), StoreError> {
        lock(&self.slots).insert(slot, value.to_string());
        Ok(())
    }

    fn remove(&self, slot: TokenSlot) -> Result<(), StoreError> {
        lock(&self.slots).remove(&slot);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FileTokenStore
// ---------------------------------------------------------------------------

/// On-disk record. Empty slots are omitted from the file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredTokens {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
}

impl StoredTokens {
    fn slot_mut(&mut self, slot: TokenSlot) -> &mut Option<String> {
        match slot {
            TokenSlot::AccessToken => &mut self.access_token,
            TokenSlot::RefreshToken => &mut self.refresh_token,
        }
    }
}

/// Token store backed by a small JSON file.
///
/// ```json
/// { "access_token": "...", "refresh_token": "..." }
/// ```
///
/// Every write goes to a sibling temp file that is then renamed over the
/// original, so a crash mid-write leaves either the old or the new record,
/// never a truncated one. A missing file reads as "no tokens".
///
/// I/O is blocking; see [`TokenStore`] for where it runs.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    io: Mutex<()>,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            io: Mutex::new(()),
        }
    }

    /// The backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn load(&self) -> Result<StoredTokens, StoreError> {
        match fs::read(&self.path) {
            Ok(bytes) => JsonCodec.decode(&bytes).map_err(|source| StoreError::Corrupt {
                path: self.path.clone(),
                source,
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(StoredTokens::default()),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn save(&self, tokens: &StoredTokens) -> Result<(), StoreError> {
        let bytes = JsonCodec.encode(tokens).map_err(StoreError::Encode)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, &bytes).map_err(|e| self.io_error(e))?;
        restrict_permissions(&tmp).map_err(|e| self.io_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))
    }

    fn update(
        &self,
        slot: TokenSlot,
        value: Option<&str>,
    ) -> Result<(), StoreError> {
        let _io = lock(&self.io);
        let mut tokens = match self.load() {
            Err(StoreError::Corrupt { path, source }) => {
                tracing::warn!(path = %path.display(), error = %source, "replacing corrupt token file");
                StoredTokens::default()
            }
            other => other?,
        };
        let current = tokens.slot_mut(slot);
        if current.as_deref() == value {
            return Ok(());
        }
        *current = value.map(str::to_string);
        self.save(&tokens)
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self, slot: TokenSlot) -> Result<Option<String>, StoreError> {
        let _io = lock(&self.io);
        let mut tokens = self.load()?;
        Ok(tokens.slot_mut(slot).take())
    }

    fn set(&self, slot: TokenSlot, value: &str) -> Result<(), StoreError> {
        self.update(slot, Some(value))
    }

    fn remove(&self, slot: TokenSlot) -> Result<(), StoreError> {
        self.update(slot, None)
    }
}

/// Tokens are credentials: owner read/write only.
#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

// =========================================================================
// Tests
// =========================================================================
