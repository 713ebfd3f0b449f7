// Bearer token storage.
// The token is persisted under a fixed key and attached to every request when present.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::warn;

use crate::cache::{paths, store};
use crate::config::Config;
use crate::error::{Error, Result};

/// Storage key holding the bearer token.
pub const TOKEN_KEY: &str = "auth_token";

/// Source of the bearer token attached to outgoing requests.
pub trait TokenStore: Send + Sync {
    fn token(&self) -> Option<String>;
    fn set_token(&self, token: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Token kept in process memory only.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    fn set_token(&self, token: &str) -> Result<()> {
        *self.token.write() = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.token.write() = None;
        Ok(())
    }
}

/// Key/value JSON file with the token under [`TOKEN_KEY`].
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the configured override, or in the platform cache directory.
    pub fn from_config(config: &Config) -> Result<Self> {
        config
            .token_path
            .clone()
            .or_else(paths::storage_path)
            .map(Self::new)
            .ok_or_else(|| Error::Config("no location available for token storage".to_string()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_storage(&self) -> Result<HashMap<String, String>> {
        Ok(store::read_json(&self.path)?.unwrap_or_default())
    }
}

impl TokenStore for FileTokenStore {
    fn token(&self) -> Option<String> {
        match self.read_storage() {
            Ok(mut storage) => storage.remove(TOKEN_KEY).filter(|t| !t.is_empty()),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "unreadable token storage");
                None
            }
        }
    }

    fn set_token(&self, token: &str) -> Result<()> {
        let mut storage = self.read_storage()?;
        storage.insert(TOKEN_KEY.to_string(), token.to_string());
        store::write_json(&self.path, &storage)
    }

    fn clear(&self) -> Result<()> {
        let mut storage = self.read_storage()?;
        if storage.remove(TOKEN_KEY).is_none() {
            return Ok(());
        }
        if storage.is_empty() {
            store::delete(&self.path)
        } else {
            store::write_json(&self.path, &storage)
        }
    }
}
