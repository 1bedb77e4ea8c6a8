//! Insertion-ordered accumulation and bounded Top-N selection.
//!
//! Every analyzer tallies into a [`Ledger`], which keeps entries in the order
//! their key was first seen during traversal. Ranking uses a stable sort, so
//! entries that tie on the sort key stay in first-sighting order: the same
//! history always ranks identically, while a different traversal order may
//! break ties differently.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::hash::Hash;

pub(crate) struct Ledger<K, V> {
    index: HashMap<K, usize>,
    entries: Vec<V>,
}

impl<K: Eq + Hash, V> Ledger<K, V> {
    pub(crate) fn new() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }

    /// Entry for `key`, created with `make` on first sighting.
    pub(crate) fn get_or_insert_with<Q>(&mut self, key: &Q, make: impl FnOnce() -> V) -> &mut V
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
    {
        let idx = match self.index.get(key) {
            Some(&idx) => idx,
            None => {
                let idx = self.entries.len();
                self.index.insert(key.to_owned(), idx);
                self.entries.push(make());
                idx
            }
        };
        &mut self.entries[idx]
    }

    pub(crate) fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.get(key).map(|&idx| &self.entries[idx])
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn into_values(self) -> Vec<V> {
        self.entries
    }
}

/// Stable-sort `items` with `compare` and keep the first `top`.
pub(crate) fn top_n<T>(
    mut items: Vec<T>,
    top: usize,
    compare: impl FnMut(&T, &T) -> Ordering,
) -> Vec<T> {
    items.sort_by(compare);
    items.truncate(top);
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_keep_first_sighting_order() {
        let mut ledger: Ledger<String, (String, u32)> = Ledger::new();
        for key in ["b", "a", "b", "c", "a", "b"] {
            ledger.get_or_insert_with(key, || (key.to_string(), 0)).1 += 1;
        }

        assert_eq!(ledger.len(), 3);
        assert_eq!(ledger.get("b"), Some(&("b".to_string(), 3)));
        let keys: Vec<String> = ledger.into_values().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn top_n_is_stable_on_ties() {
        let items = vec![("x", 1), ("y", 2), ("z", 1), ("w", 2)];
        let ranked = top_n(items, 3, |a, b| b.1.cmp(&a.1));
        assert_eq!(ranked, vec![("y", 2), ("w", 2), ("x", 1)]);
    }

    #[test]
    fn top_n_zero_is_empty() {
        let ranked = top_n(vec![1, 2, 3], 0, |a: &i32, b: &i32| b.cmp(a));
        assert!(ranked.is_empty());
    }
}
