//! Durable storage for the access and refresh tokens.
//!
//! A [`TokenStore`] is a plain string key/value store. The session decides
//! which two keys it uses via [`TokenKeys`]. Writes to the two keys are not
//! transactional: a crash between them can leave the pair inconsistent.

mod file;
mod memory;

pub use file::FileTokenStore;
pub use memory::MemoryTokenStore;

use crate::error::StoreError;

/// Key/value persistence for token strings.
pub trait TokenStore: Send + Sync {
    /// Returns the stored value, or `None` if absent or unreadable.
    fn get(&self, key: &str) -> Option<String>;

    /// Overwrite the value stored under `key`.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete the value stored under `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// The key names under which the two tokens are stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenKeys {
    pub access: String,
    pub refresh: String,
}

impl TokenKeys {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: refresh.into(),
        }
    }

    /// `accessToken` / `refreshToken`.
    pub fn camel_case() -> Self {
        Self::new("accessToken", "refreshToken")
    }
}

impl Default for TokenKeys {
    /// `token` / `refresh`.
    fn default() -> Self {
        Self::new("token", "refresh")
    }
}
