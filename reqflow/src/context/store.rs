//! Per-processor variable storage.

use serde_json::Value;
use std::collections::HashMap;

/// The local variable table of a single processor.
///
/// The backing map is only allocated on the first write, so processors that
/// never store a local variable carry no table at all.
#[derive(Debug, Clone, Default)]
pub struct VariableStore {
    values: Option<HashMap<String, Value>>,
}

impl VariableStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks if a key exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values
            .as_ref()
            .is_some_and(|values| values.contains_key(name))
    }

    /// Gets a value from the store.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.as_ref().and_then(|values| values.get(name))
    }

    /// Inserts a value, returning the previous one if the key existed.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.values
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), value)
    }

    /// Removes a value, returning it if the key existed.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.as_mut().and_then(|values| values.remove(name))
    }

    /// Returns true once the backing map has been allocated.
    #[must_use]
    pub const fn is_allocated(&self) -> bool {
        self.values.is_some()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.as_ref().map_or(0, HashMap::len)
    }

    /// Returns true if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns all keys.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.values
            .as_ref()
            .map(|values| values.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns a copy of all values.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, Value> {
        self.values.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lazy_allocation() {
        let mut store = VariableStore::new();
        assert!(!store.is_allocated());
        assert!(!store.contains("key"));
        assert_eq!(store.remove("key"), None);
        assert!(!store.is_allocated());

        store.insert("key", json!(1));
        assert!(store.is_allocated());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_insert_returns_previous() {
        let mut store = VariableStore::new();
        assert_eq!(store.insert("key", json!("a")), None);
        assert_eq!(store.insert("key", json!("b")), Some(json!("a")));
        assert_eq!(store.get("key"), Some(&json!("b")));
    }

    #[test]
    fn test_null_counts_as_present() {
        let mut store = VariableStore::new();
        store.insert("nothing", Value::Null);

        assert!(store.contains("nothing"));
        assert_eq!(store.remove("nothing"), Some(Value::Null));
        assert!(store.is_empty());
    }

    #[test]
    fn test_to_dict() {
        let mut store = VariableStore::new();
        store.insert("a", json!(1));
        store.insert("b", json!(2));

        let dict = store.to_dict();
        assert_eq!(dict.len(), 2);
        assert_eq!(store.keys().len(), 2);
    }
}
