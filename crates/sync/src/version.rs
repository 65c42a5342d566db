//! Conflict-detection tokens, one per remote resource.
//!
//! The write API returns an opaque token with every confirmed write; the
//! next write to the same resource sends it back as a precondition. A
//! mismatch on the server side means someone else changed the resource in
//! between, and surfaces as `WriteError::Conflict`.
//!
//! Process-wide singleton: constructed once at application start and
//! shared by reference. Tokens live for the lifetime of the page/process
//! and are overwritten on every confirmed write.

use std::collections::HashMap;
use std::sync::Mutex;

/// Stores the latest version token per resource key.
#[derive(Debug, Default)]
pub struct VersionTokenStore {
    tokens: Mutex<HashMap<String, String>>,
}

impl VersionTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, resource_key: &str) -> Option<String> {
        self.tokens.lock().unwrap().get(resource_key).cloned()
    }

    pub fn set(&self, resource_key: &str, token: &str) {
        self.tokens
            .lock()
            .unwrap()
            .insert(resource_key.to_string(), token.to_string());
    }

    /// Forget a resource's token (e.g. after the entity was deleted).
    pub fn remove(&self, resource_key: &str) {
        self.tokens.lock().unwrap().remove(resource_key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_overwrites() {
        let store = VersionTokenStore::new();
        assert_eq!(store.get("a1"), None);

        store.set("a1", "v1");
        store.set("a1", "v2");
        assert_eq!(store.get("a1"), Some("v2".to_string()));

        store.remove("a1");
        assert_eq!(store.get("a1"), None);
    }
}
