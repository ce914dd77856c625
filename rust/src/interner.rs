//! Activity id interning.
//!
//! Activities live in a flat `Vec`; the interner maps each string id to its
//! slot so every cross reference is an integer lookup.

use rustc_hash::FxHashMap;

/// Dense index of an activity in the activity table.
pub type ActivityIndex = u32;

/// Two-way mapping between activity ids and table slots.
#[derive(Debug, Clone, Default)]
pub struct ActivityInterner {
    to_index: FxHashMap<String, ActivityIndex>,
    from_index: Vec<String>,
}

impl ActivityInterner {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            to_index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            from_index: Vec::with_capacity(capacity),
        }
    }

    /// Register a new id. Returns `None` if the id is already taken.
    pub fn insert(&mut self, id: &str) -> Option<ActivityIndex> {
        if self.to_index.contains_key(id) {
            return None;
        }
        let index = self.from_index.len() as ActivityIndex;
        self.from_index.push(id.to_string());
        self.to_index.insert(id.to_string(), index);
        Some(index)
    }

    #[inline]
    pub fn get(&self, id: &str) -> Option<ActivityIndex> {
        self.to_index.get(id).copied()
    }

    #[inline]
    pub fn contains(&self, id: &str) -> bool {
        self.to_index.contains_key(id)
    }

    #[inline]
    pub fn resolve(&self, index: ActivityIndex) -> Option<&str> {
        self.from_index.get(index as usize).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.from_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.from_index.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_resolve() {
        let mut interner = ActivityInterner::with_capacity(4);

        let a = interner.insert("A").unwrap();
        let b = interner.insert("B").unwrap();

        assert_ne!(a, b);
        assert_eq!(interner.resolve(a), Some("A"));
        assert_eq!(interner.get("B"), Some(b));
        assert_eq!(interner.get("C"), None);
        assert_eq!(interner.len(), 2);
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let mut interner = ActivityInterner::default();
        assert_eq!(interner.insert("A"), Some(0));
        assert_eq!(interner.insert("A"), None);
        assert_eq!(interner.len(), 1);
    }
}
