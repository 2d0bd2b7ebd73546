//! Read-only mappings over index-addressed engine collections.
//!
//! The engine exposes every keyed collection (markers, attributes, ratings,
//! parts, infos) as a count plus per-index key/value accessors and a direct
//! by-key lookup. [`LazyView`] turns any such quadruple into a mapping
//! without copying it: each traversal walks indices `0..len` again and asks
//! the engine for every entry.

use std::fmt;
use std::marker::PhantomData;
use std::ops::Range;

use crate::{Error, Result};

/// The per-index and by-key accessors of one engine collection. Its size
/// is read once by whoever builds the view and passed in as `len`.
///
/// `value_of` returning `None` is how a backend says "no such key".
pub trait Accessors<'a>: Copy {
    type Raw;

    fn key(&self, index: usize) -> &'a str;
    fn value(&self, index: usize) -> Self::Raw;
    fn value_of(&self, key: &str) -> Option<Self::Raw>;
}

fn identity<T>(value: T) -> T {
    value
}

pub struct LazyView<'a, A: Accessors<'a>, V> {
    len: usize,
    access: A,
    make: fn(A::Raw) -> V,
    _marker: PhantomData<&'a ()>,
}

impl<'a, A: Accessors<'a>> LazyView<'a, A, A::Raw> {
    /// A view that exposes raw values as they are.
    pub fn new(len: usize, access: A) -> Self {
        Self::with(len, access, identity)
    }
}

impl<'a, A: Accessors<'a>, V> LazyView<'a, A, V> {
    /// A view that passes every raw value through `make` before handing it out.
    pub fn with(len: usize, access: A, make: fn(A::Raw) -> V) -> Self {
        Self {
            len,
            access,
            make,
            _marker: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn keys(&self) -> impl ExactSizeIterator<Item = &'a str> {
        let access = self.access;
        (0..self.len).map(move |idx| access.key(idx))
    }

    pub fn values(&self) -> impl ExactSizeIterator<Item = V> + use<'a, A, V> {
        let access = self.access;
        let make = self.make;
        (0..self.len).map(move |idx| make(access.value(idx)))
    }

    /// `(key, value)` pairs, both taken from the same index.
    pub fn iter(&self) -> Iter<'a, A, V> {
        Iter {
            indices: 0..self.len,
            access: self.access,
            make: self.make,
            _marker: PhantomData,
        }
    }

    /// Direct keyed lookup through the engine, without scanning.
    pub fn get(&self, key: &str) -> Result<V> {
        match self.access.value_of(key) {
            Some(raw) => Ok((self.make)(raw)),
            None => Err(Error::KeyNotFound(key.to_owned())),
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.access.value_of(key).is_some()
    }
}

impl<'a, A: Accessors<'a>, V> Clone for LazyView<'a, A, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, A: Accessors<'a>, V> Copy for LazyView<'a, A, V> {}

impl<'a, A: Accessors<'a>, V> IntoIterator for LazyView<'a, A, V> {
    type Item = (&'a str, V);
    type IntoIter = Iter<'a, A, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'v, 'a, A: Accessors<'a>, V> IntoIterator for &'v LazyView<'a, A, V> {
    type Item = (&'a str, V);
    type IntoIter = Iter<'a, A, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, A: Accessors<'a>, V: fmt::Debug> fmt::Debug for LazyView<'a, A, V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

pub struct Iter<'a, A: Accessors<'a>, V> {
    indices: Range<usize>,
    access: A,
    make: fn(A::Raw) -> V,
    _marker: PhantomData<&'a ()>,
}

impl<'a, A: Accessors<'a>, V> Iterator for Iter<'a, A, V> {
    type Item = (&'a str, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.indices
            .next()
            .map(|idx| (self.access.key(idx), (self.make)(self.access.value(idx))))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.indices.size_hint()
    }
}

impl<'a, A: Accessors<'a>, V> ExactSizeIterator for Iter<'a, A, V> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Parallel key/value slices where the by-key accessor deliberately
    /// disagrees with the by-index one, and every call is counted.
    #[derive(Clone, Copy)]
    struct Table<'a> {
        keys: &'a [&'static str],
        values: &'a [i32],
        by_key: &'a [(&'static str, i32)],
        calls: &'a Cell<usize>,
    }

    impl<'a> Accessors<'a> for Table<'a> {
        type Raw = i32;

        fn key(&self, index: usize) -> &'a str {
            self.calls.set(self.calls.get() + 1);
            self.keys[index]
        }

        fn value(&self, index: usize) -> i32 {
            self.calls.set(self.calls.get() + 1);
            self.values[index]
        }

        fn value_of(&self, key: &str) -> Option<i32> {
            self.calls.set(self.calls.get() + 1);
            self.by_key.iter().find(|(k, _)| *k == key).map(|&(_, v)| v)
        }
    }

    fn doubled(value: i32) -> i64 {
        i64::from(value) * 2
    }

    #[test]
    fn lengths_and_index_order() {
        let calls = Cell::new(0);
        let table = Table {
            keys: &["a", "b", "c"],
            values: &[1, 2, 3],
            by_key: &[],
            calls: &calls,
        };
        let view = LazyView::new(table.keys.len(), table);

        assert_eq!(view.len(), 3);
        assert!(!view.is_empty());
        assert_eq!(view.keys().collect::<Vec<_>>(), ["a", "b", "c"]);
        assert_eq!(view.values().collect::<Vec<_>>(), [1, 2, 3]);
        assert_eq!(view.iter().collect::<Vec<_>>(), [("a", 1), ("b", 2), ("c", 3)]);
        assert_eq!(view.iter().len(), 3);
    }

    #[test]
    fn items_pair_by_index_not_by_key() {
        let calls = Cell::new(0);
        let table = Table {
            keys: &["dup", "dup"],
            values: &[10, 20],
            by_key: &[("dup", 99)],
            calls: &calls,
        };
        let view = LazyView::new(table.keys.len(), table);

        let keys: Vec<_> = view.keys().collect();
        let values: Vec<_> = view.values().collect();
        let items: Vec<_> = view.iter().collect();

        for (i, item) in items.iter().enumerate() {
            assert_eq!(*item, (keys[i], values[i]));
        }
        assert_eq!(items, [("dup", 10), ("dup", 20)]);
        assert_eq!(view.get("dup").unwrap(), 99);
    }

    #[test]
    fn get_applies_constructor_and_reports_missing_keys() {
        let calls = Cell::new(0);
        let table = Table {
            keys: &["x"],
            values: &[4],
            by_key: &[("x", 4)],
            calls: &calls,
        };
        let view = LazyView::with(table.keys.len(), table, doubled);

        assert_eq!(view.get("x").unwrap(), 8);
        assert_eq!(view.values().collect::<Vec<_>>(), [8]);
        assert!(view.contains_key("x"));
        assert!(!view.contains_key("y"));

        match view.get("y") {
            Err(Error::KeyNotFound(key)) => assert_eq!(key, "y"),
            other => panic!("expected KeyNotFound, got {:?}", other),
        }
    }

    #[test]
    fn traversals_are_not_cached() {
        let calls = Cell::new(0);
        let table = Table {
            keys: &["a", "b"],
            values: &[1, 2],
            by_key: &[],
            calls: &calls,
        };
        let view = LazyView::new(table.keys.len(), table);
        assert_eq!(calls.get(), 0);

        assert_eq!(view.iter().count(), 2);
        let first = calls.get();
        assert_eq!(first, 4);

        assert_eq!(view.iter().count(), 2);
        assert_eq!(calls.get(), first * 2);
    }

    #[test]
    fn empty_view() {
        let calls = Cell::new(0);
        let table = Table {
            keys: &[],
            values: &[],
            by_key: &[],
            calls: &calls,
        };
        let view = LazyView::new(table.keys.len(), table);

        assert!(view.is_empty());
        assert_eq!(view.keys().count(), 0);
        assert_eq!(view.into_iter().count(), 0);
        assert_eq!(format!("{:?}", view), "{}");
    }
}
