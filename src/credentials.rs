//! Cached master tokens, keyed by account name.

use anyhow::{Context, Result};
use std::cell::RefCell;
use std::collections::HashMap;

/// Keyring service the tokens are filed under.
pub const TOKEN_SERVICE: &str = "google-keep-token";

pub trait TokenStore {
    fn get(&self, username: &str) -> Result<Option<String>>;
    fn set(&self, username: &str, token: &str) -> Result<()>;
}

/// Tokens in the OS credential store: the kernel keyring on Linux (kept
/// until logout), Keychain on macOS, Credential Manager on Windows. A token
/// gone missing just means the next run logs in with the password again.
#[derive(Debug, Default)]
pub struct KeyringTokenStore;

impl KeyringTokenStore {
    pub fn new() -> Self {
        Self
    }
}

impl TokenStore for KeyringTokenStore {
    fn get(&self, username: &str) -> Result<Option<String>> {
        let entry = keyring::Entry::new(TOKEN_SERVICE, username)
            .context("Cannot open keyring entry")?;
        match entry.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Cannot read token from keyring"),
        }
    }

    fn set(&self, username: &str, token: &str) -> Result<()> {
        let entry = keyring::Entry::new(TOKEN_SERVICE, username)
            .context("Cannot open keyring entry")?;
        entry
            .set_password(token)
            .context("Cannot save token to keyring")
    }
}

/// Process-local store for tests and throwaway runs.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: RefCell<HashMap<String, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(username: &str, token: &str) -> Self {
        let store = Self::new();
        store
            .tokens
            .borrow_mut()
            .insert(username.to_string(), token.to_string());
        store
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, username: &str) -> Result<Option<String>> {
        Ok(self.tokens.borrow().get(username).cloned())
    }

    fn set(&self, username: &str, token: &str) -> Result<()> {
        self.tokens
            .borrow_mut()
            .insert(username.to_string(), token.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store() -> Result<()> {
        let store = MemoryTokenStore::new();
        assert_eq!(store.get("me")?, None);

        store.set("me", "tok-1")?;
        store.set("me", "tok-2")?;
        assert_eq!(store.get("me")?.as_deref(), Some("tok-2"));
        assert_eq!(store.get("other")?, None);
        Ok(())
    }
}
