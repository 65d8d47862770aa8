use std::collections::HashMap;

use super::Handle;

/// Append-only arena of named records. Handles index the backing vector, so
/// insertion order doubles as a dense `0..len` numbering.
pub struct AssetCache<T> {
    items: Vec<T>,
    names: HashMap<String, Handle<T>>,
}

impl<T> AssetCache<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            names: HashMap::new(),
        }
    }

    /// Inserts `item` under `name`. A name that is already taken keeps its
    /// original record and the existing handle comes back unchanged.
    pub fn insert(&mut self, name: impl Into<String>, item: T) -> Handle<T> {
        let name = name.into();
        if let Some(&existing) = self.names.get(&name) {
            return existing;
        }

        let handle = Handle::new(self.items.len());
        self.items.push(item);
        self.names.insert(name, handle);
        handle
    }

    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        self.items.get(handle.index())
    }

    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        self.items.get_mut(handle.index())
    }

    pub fn find(&self, name: &str) -> Option<Handle<T>> {
        self.names.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> {
        self.items
            .iter()
            .enumerate()
            .map(|(index, item)| (Handle::new(index), item))
    }

    pub fn values(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> Default for AssetCache<T> {
    fn default() -> Self {
        Self::new()
    }
}
