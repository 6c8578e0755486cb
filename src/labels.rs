use indexmap::IndexMap;

/// Label table for one file: exact name → byte address. Insertion order is
/// kept so verbose dumps list labels in source order.
#[derive(Debug, Clone, Default)]
pub struct Labels {
    labels: IndexMap<String, u64>,
}

impl Labels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a definition. The first definition of a name is authoritative;
    /// a later duplicate is shadowed and `false` is returned so the caller
    /// can report it.
    pub fn add(&mut self, key: &str, value: u64) -> bool {
        if self.labels.contains_key(key) {
            return false;
        }
        self.labels.insert(key.to_owned(), value);
        true
    }

    pub fn get(&self, key: &str) -> Option<u64> {
        self.labels.get(key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.labels.iter().map(|(key, value)| (key.as_str(), *value))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
