use std::fmt;
use std::iter::FusedIterator;

use indexmap::IndexMap;

use crate::Value;

/// A map type with [`String`] keys and [`Value`] values.
///
/// Entries keep their insertion order, which is also the order they are
/// written in when the compound is encoded to binary.
#[derive(Clone, PartialEq, Default)]
pub struct Compound {
    map: IndexMap<String, Value>,
}

impl fmt::Debug for Compound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.map.fmt(f)
    }
}

impl Compound {
    pub fn new() -> Self {
        Self {
            map: IndexMap::new(),
        }
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            map: IndexMap::with_capacity(cap),
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    pub fn get(&self, k: &str) -> Option<&Value> {
        self.map.get(k)
    }

    pub fn get_mut(&mut self, k: &str) -> Option<&mut Value> {
        self.map.get_mut(k)
    }

    pub fn contains_key(&self, k: &str) -> bool {
        self.map.contains_key(k)
    }

    pub fn insert<K, V>(&mut self, k: K, v: V) -> Option<Value>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.map.insert(k.into(), v.into())
    }

    /// Removes the entry with the given key, if present.
    ///
    /// Removal does not disturb the relative order of the remaining entries.
    pub fn remove(&mut self, k: &str) -> Option<Value> {
        self.map.shift_remove(k)
    }

    pub fn iter(&self) -> impl FusedIterator<Item = (&String, &Value)> + Clone + '_ {
        self.map.iter()
    }

    pub fn keys(&self) -> impl FusedIterator<Item = &String> + Clone + '_ {
        self.map.keys()
    }
}

impl Extend<(String, Value)> for Compound {
    fn extend<T>(&mut self, iter: T)
    where
        T: IntoIterator<Item = (String, Value)>,
    {
        self.map.extend(iter)
    }
}

impl FromIterator<(String, Value)> for Compound {
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = (String, Value)>,
    {
        Self {
            map: IndexMap::from_iter(iter),
        }
    }
}

impl IntoIterator for Compound {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.map.into_iter()
    }
}

impl<'a> IntoIterator for &'a Compound {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.map.iter()
    }
}
