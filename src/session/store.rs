//! Credential persistence behind a two-slot store
//!
//! The role token and the account token live in separate slots and are
//! set/cleared independently; clearing one never touches the other.

use std::sync::Mutex;

/// Which credential a token belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialSlot {
    /// App role token (`/auth/login`)
    Role,
    /// Personal account token (`/api/users/login`)
    Account,
}

impl CredentialSlot {
    fn index(self) -> usize {
        match self {
            CredentialSlot::Role => 0,
            CredentialSlot::Account => 1,
        }
    }

    fn name(self) -> &'static str {
        match self {
            CredentialSlot::Role => "role",
            CredentialSlot::Account => "account",
        }
    }
}

/// Token storage used by the HTTP client and the session state
pub trait CredentialStore: Send + Sync {
    fn get(&self, slot: CredentialSlot) -> Option<String>;
    fn set(&self, slot: CredentialSlot, token: &str);
    fn clear(&self, slot: CredentialSlot);
}

/// Process-local credential store, the default everywhere
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    tokens: Mutex<[Option<String>; 2]>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, slot: CredentialSlot) -> Option<String> {
        self.tokens.lock().ok()?[slot.index()].clone()
    }

    fn set(&self, slot: CredentialSlot, token: &str) {
        if let Ok(mut tokens) = self.tokens.lock() {
            tokens[slot.index()] = Some(token.to_string());
        }
    }

    fn clear(&self, slot: CredentialSlot) {
        if let Ok(mut tokens) = self.tokens.lock() {
            tokens[slot.index()] = None;
        }
    }
}

/// Browser localStorage credential store.
///
/// Holds only the key prefix; the storage handle is looked up per call
/// so the struct stays `Send + Sync`.
#[cfg(feature = "wasm")]
pub struct LocalStorageCredentialStore {
    key_prefix: String,
}

#[cfg(feature = "wasm")]
impl LocalStorageCredentialStore {
    pub fn new(key_prefix: impl Into<String>) -> Self {
        Self {
            key_prefix: key_prefix.into(),
        }
    }

    fn storage() -> Option<web_sys::Storage> {
        web_sys::window()?.local_storage().ok().flatten()
    }

    fn key(&self, slot: CredentialSlot) -> String {
        format!("{}:{}", self.key_prefix, slot.name())
    }
}

#[cfg(feature = "wasm")]
impl CredentialStore for LocalStorageCredentialStore {
    fn get(&self, slot: CredentialSlot) -> Option<String> {
        Self::storage()?.get_item(&self.key(slot)).ok().flatten()
    }

    fn set(&self, slot: CredentialSlot, token: &str) {
        if let Some(storage) = Self::storage() {
            if storage.set_item(&self.key(slot), token).is_err() {
                log::warn!("failed to persist {} credential", slot.name());
            }
        }
    }

    fn clear(&self, slot: CredentialSlot) {
        if let Some(storage) = Self::storage() {
            let _ = storage.remove_item(&self.key(slot));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_slots_are_independent() {
        let store = MemoryCredentialStore::new();
        assert!(store.get(CredentialSlot::Role).is_none());

        store.set(CredentialSlot::Role, "role-token");
        store.set(CredentialSlot::Account, "account-token");
        assert_eq!(
            store.get(CredentialSlot::Role).as_deref(),
            Some("role-token")
        );
        assert_eq!(
            store.get(CredentialSlot::Account).as_deref(),
            Some("account-token")
        );

        store.clear(CredentialSlot::Role);
        assert!(store.get(CredentialSlot::Role).is_none());
        assert_eq!(
            store.get(CredentialSlot::Account).as_deref(),
            Some("account-token")
        );
    }

    #[test]
    fn test_memory_store_overwrites_in_place() {
        let store = MemoryCredentialStore::new();
        store.set(CredentialSlot::Account, "first");
        store.set(CredentialSlot::Account, "second");
        assert_eq!(store.get(CredentialSlot::Account).as_deref(), Some("second"));
    }
}
