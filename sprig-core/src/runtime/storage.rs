//! Key-value persistence used by `$persist`.

use std::cell::RefCell;
use std::collections::HashMap;

/// A synchronous key-value store holding JSON values, in the spirit of a
/// browser's local storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<serde_json::Value>;

    fn set(&self, key: &str, value: serde_json::Value);
}

/// In-memory store. The default when the host provides none.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, serde_json::Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: serde_json::Value) {
        self.entries.borrow_mut().insert(key.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn memory_store_overwrites() {
        let store = MemoryStore::new();
        assert!(store.is_empty());
        store.set("count", json!(1));
        store.set("count", json!(2));
        assert_eq!(store.get("count"), Some(json!(2)));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("missing"), None);
    }
}
