#![allow(clippy::manual_map)]

use core::{
    hash::{BuildHasher, Hash},
    iter::FusedIterator,
    mem,
    ops::Index,
};
use std::{
    collections::{hash_map::RandomState, TryReserveError},
    fmt::{self, Debug},
};

use raw::{
    alloc_buckets,
    iter::{RawIntoIter, RawIter, RawIterMut},
    util::{equivalent_key, make_hash, make_hasher},
    BucketArray, RawTable,
};

pub mod compare;
pub mod demo;
mod error;
mod raw;

pub use error::{ChainedMapError, Result};
pub use hashbrown::Equivalent;
pub use raw::BucketStats;

/// Number of buckets a map starts with unless told otherwise.
pub const DEFAULT_CAPACITY: usize = 16;

/// Ratio of entries to buckets at which the bucket array doubles.
pub const LOAD_FACTOR: f64 = 0.75;

#[cfg(feature = "fxhash")]
pub type FxChainedMap<K, V> = ChainedMap<K, V, core::hash::BuildHasherDefault<rustc_hash::FxHasher>>;
pub type AChainedMap<K, V> = ChainedMap<K, V, core::hash::BuildHasherDefault<ahash::AHasher>>;

/// A hash map resolving collisions by chaining.
///
/// Entries live in a fixed-size array of buckets, each holding the list of
/// entries whose hash reduces to that bucket. Once an insertion would bring
/// `len / capacity` to [`LOAD_FACTOR`], the array is doubled and every entry
/// is moved into the new one. The array never shrinks.
///
/// # Examples
///
/// ```
/// use chain_map::ChainedMap;
///
/// let mut map = ChainedMap::new();
/// map.insert("k1".to_string(), "a");
/// map.insert("k1".to_string(), "b");
/// assert_eq!(map.get("k1"), Some(&"b"));
/// assert_eq!(map.len(), 1);
/// assert_eq!(map.capacity(), 16);
/// ```
#[derive(Clone)]
pub struct ChainedMap<K, V, S = RandomState> {
    table: RawTable<(K, V)>,
    hash_builder: S,
}

impl<K, V, S> Debug for ChainedMap<K, V, S>
where
    K: Debug,
    V: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S: Default> Default for ChainedMap<K, V, S> {
    /// Creates an empty `ChainedMap<K, V, S>` with [`DEFAULT_CAPACITY`] buckets and
    /// the `Default` value for the hasher.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::collections::hash_map::RandomState;
    ///
    /// use chain_map::ChainedMap;
    ///
    /// let map: ChainedMap<u32, String> = ChainedMap::default();
    /// assert_eq!(map.capacity(), 16);
    /// let map: ChainedMap<u32, String, RandomState> = ChainedMap::default();
    /// assert!(map.is_empty());
    /// ```
    #[inline]
    fn default() -> Self {
        Self::with_hasher(Default::default())
    }
}

impl<K, V> ChainedMap<K, V, RandomState> {
    /// Creates an empty `ChainedMap` with [`DEFAULT_CAPACITY`] buckets.
    #[inline]
    pub fn new() -> Self {
        Self::with_hasher(Default::default())
    }

    /// Creates an empty `ChainedMap` with `capacity` buckets.
    ///
    /// A capacity of zero is raised to one.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, Default::default())
    }

    /// Like [`ChainedMap::with_capacity`], but reports a failed allocation
    /// instead of aborting.
    ///
    /// # Examples
    ///
    /// ```
    /// use chain_map::{ChainedMap, ChainedMapError};
    ///
    /// let map = ChainedMap::<u64, u64>::try_with_capacity(64).unwrap();
    /// assert_eq!(map.capacity(), 64);
    ///
    /// let err = ChainedMap::<u64, u64>::try_with_capacity(usize::MAX).unwrap_err();
    /// assert!(matches!(err, ChainedMapError::AllocationFailure(_)));
    /// ```
    pub fn try_with_capacity(capacity: usize) -> Result<Self> {
        Ok(Self {
            table: RawTable::try_with_capacity(capacity)?,
            hash_builder: Default::default(),
        })
    }
}

impl<K, V, S> ChainedMap<K, V, S> {
    /// Creates an empty `ChainedMap` with [`DEFAULT_CAPACITY`] buckets which
    /// will use the given hash builder to hash keys.
    ///
    /// # Examples
    ///
    /// ```
    /// use core::hash::BuildHasherDefault;
    ///
    /// use chain_map::ChainedMap;
    ///
    /// let s = BuildHasherDefault::<ahash::AHasher>::default();
    /// let mut map = ChainedMap::with_hasher(s);
    /// map.insert(1, 2);
    /// ```
    #[inline]
    pub fn with_hasher(hash_builder: S) -> Self {
        Self::with_capacity_and_hasher(DEFAULT_CAPACITY, hash_builder)
    }

    /// Creates an empty `ChainedMap` with `capacity` buckets, using
    /// `hash_builder` to hash the keys.
    #[inline]
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        Self {
            table: RawTable::with_capacity(capacity),
            hash_builder,
        }
    }

    /// Returns a reference to the map's [`BuildHasher`].
    #[inline]
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    /// Returns the number of buckets.
    ///
    /// Unlike the standard maps this is not a promise about how many entries
    /// fit without reallocating: the array doubles once `len` reaches three
    /// quarters of it.
    ///
    /// # Examples
    ///
    /// ```
    /// use chain_map::ChainedMap;
    ///
    /// let mut map: ChainedMap<i32, i32> = ChainedMap::new();
    /// for i in 0..11 {
    ///     map.insert(i, i);
    /// }
    /// assert_eq!(map.capacity(), 16);
    /// map.insert(11, 11);
    /// assert_eq!(map.capacity(), 32);
    /// ```
    #[inline]
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Current `len / capacity` ratio.
    #[inline]
    pub fn load_factor(&self) -> f64 {
        self.table.len() as f64 / self.table.capacity() as f64
    }

    /// Reports how entries are spread over the buckets.
    pub fn bucket_stats(&self) -> BucketStats {
        self.table.stats()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.table.len() == 0
    }

    /// Removes every entry. The bucket array keeps its size.
    #[inline]
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Iterates over the entries bucket by bucket.
    ///
    /// The order is not stable across insertions, and in particular not across
    /// growth. Clone the iterator, or call `iter` again, to restart it.
    #[inline]
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.table.iter(),
        }
    }

    #[inline]
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            inner: self.table.iter_mut(),
        }
    }

    #[inline]
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    #[inline]
    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    #[inline]
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut {
            inner: self.iter_mut(),
        }
    }
}

impl<K, V, S> ChainedMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    #[inline]
    pub fn get<Q: ?Sized>(&self, k: &Q) -> Option<&V>
    where
        Q: Hash + Equivalent<K>,
    {
        // Avoid `Option::map` because it bloats LLVM IR.
        match self.get_inner(k) {
            Some((_, v)) => Some(v),
            None => None,
        }
    }

    /// Returns a mutable reference to the value corresponding to the key.
    #[inline]
    pub fn get_mut<Q: ?Sized>(&mut self, k: &Q) -> Option<&mut V>
    where
        Q: Hash + Equivalent<K>,
    {
        let hash = make_hash::<Q, S>(&self.hash_builder, k);
        match self.table.get_mut(hash, equivalent_key(k)) {
            Some((_, v)) => Some(v),
            None => None,
        }
    }

    /// Returns the key-value pair corresponding to the supplied key.
    #[inline]
    pub fn get_key_value<Q: ?Sized>(&self, k: &Q) -> Option<(&K, &V)>
    where
        Q: Hash + Equivalent<K>,
    {
        match self.get_inner(k) {
            Some((key, value)) => Some((key, value)),
            None => None,
        }
    }

    #[inline]
    pub fn contains_key<Q: ?Sized>(&self, k: &Q) -> bool
    where
        Q: Hash + Equivalent<K>,
    {
        self.get_inner(k).is_some()
    }

    #[inline]
    fn get_inner<Q: ?Sized>(&self, k: &Q) -> Option<&(K, V)>
    where
        Q: Hash + Equivalent<K>,
    {
        let hash = make_hash::<Q, S>(&self.hash_builder, k);
        self.table.get(hash, equivalent_key(k))
    }

    /// Inserts a key-value pair, returning the previous value if the key was
    /// already present.
    ///
    /// An existing key keeps its identity and only the value is replaced.
    ///
    /// # Panics
    ///
    /// Panics if the bucket array has to grow and the allocation fails. Use
    /// [`ChainedMap::try_insert`] to handle that case.
    #[inline]
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        match self.insert_inner(key, value) {
            Ok(old) => old,
            Err(err) => grow_failed(err),
        }
    }

    /// Inserts a key-value pair, reporting an absent key or a failed growth
    /// as an error. On error the map is left exactly as it was.
    ///
    /// The key is always wrapped in an `Option`, so a map keyed by `Option<T>`
    /// stores `None` through `Some(None)`.
    ///
    /// # Examples
    ///
    /// ```
    /// use chain_map::{ChainedMap, ChainedMapError};
    ///
    /// let mut map: ChainedMap<&str, i32> = ChainedMap::new();
    /// assert_eq!(map.try_insert(Some("a"), 1), Ok(None));
    /// assert_eq!(map.try_insert(Some("a"), 2), Ok(Some(1)));
    /// assert_eq!(map.try_insert(None, 3), Err(ChainedMapError::InvalidKey));
    /// assert_eq!(map.len(), 1);
    /// ```
    pub fn try_insert(&mut self, key: Option<K>, value: V) -> Result<Option<V>> {
        match key {
            Some(key) => self.insert_inner(key, value),
            None => Err(ChainedMapError::InvalidKey),
        }
    }

    #[inline]
    fn insert_inner(&mut self, key: K, value: V) -> Result<Option<V>> {
        self.insert_with_alloc(key, value, alloc_buckets)
    }

    /// Insertion with the allocator used for growth passed in, so tests can
    /// make the doubled bucket array fail to allocate.
    fn insert_with_alloc(
        &mut self,
        key: K,
        value: V,
        alloc: impl FnOnce(usize) -> core::result::Result<BucketArray<(K, V)>, TryReserveError>,
    ) -> Result<Option<V>> {
        let hash = make_hash::<K, S>(&self.hash_builder, &key);
        if let Some((_, slot)) = self.table.get_mut(hash, equivalent_key(&key)) {
            return Ok(Some(mem::replace(slot, value)));
        }

        // Grow before placing the entry: a failed allocation must leave the map unchanged.
        if self.table.needs_grow_for_one_more() {
            self.table
                .grow_with(make_hasher::<K, V, S>(&self.hash_builder), alloc)?;
        }
        self.table.insert_unique(hash, (key, value));
        Ok(None)
    }

    #[inline]
    pub fn remove<Q: ?Sized>(&mut self, k: &Q) -> Option<V>
    where
        Q: Hash + Equivalent<K>,
    {
        // Avoid `Option::map` because it bloats LLVM IR.
        match self.remove_entry(k) {
            Some((_, v)) => Some(v),
            None => None,
        }
    }

    #[inline]
    pub fn remove_entry<Q: ?Sized>(&mut self, k: &Q) -> Option<(K, V)>
    where
        Q: Hash + Equivalent<K>,
    {
        let hash = make_hash::<Q, S>(&self.hash_builder, k);
        self.table.remove(hash, equivalent_key(k))
    }

    #[cfg(test)]
    fn assert_invariants(&self) {
        self.table
            .assert_placement(make_hasher::<K, V, S>(&self.hash_builder));
        assert!(self.len() * 4 < self.capacity() * 3);
    }
}

#[cold]
#[inline(never)]
fn grow_failed(err: ChainedMapError) -> ! {
    panic!("ChainedMap could not grow: {err}")
}

impl<K, V, S> PartialEq for ChainedMap<K, V, S>
where
    K: Eq + Hash,
    V: PartialEq,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        self.iter()
            .all(|(key, value)| other.get(key).map_or(false, |v| *value == *v))
    }
}

impl<K, V, S> Eq for ChainedMap<K, V, S>
where
    K: Eq + Hash,
    V: Eq,
    S: BuildHasher,
{
}

impl<K, Q: ?Sized, V, S> Index<&Q> for ChainedMap<K, V, S>
where
    K: Eq + Hash,
    Q: Hash + Equivalent<K>,
    S: BuildHasher,
{
    type Output = V;

    /// Returns a reference to the value corresponding to the supplied key.
    ///
    /// # Panics
    ///
    /// Panics if the key is not present in the `ChainedMap`.
    #[inline]
    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("key not present in ChainedMap")
    }
}

impl<K, V, S> Extend<(K, V)> for ChainedMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    #[inline]
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K, V, S> FromIterator<(K, V)> for ChainedMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    #[inline]
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = Self::with_hasher(Default::default());
        map.extend(iter);
        map
    }
}

/// Borrowing iterator over the entries of a [`ChainedMap`].
pub struct Iter<'a, K, V> {
    inner: RawIter<'a, (K, V)>,
}

impl<K, V> Clone for Iter<'_, K, V> {
    #[inline]
    fn clone(&self) -> Self {
        Iter {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<(&'a K, &'a V)> {
        match self.inner.next() {
            Some((k, v)) => Some((k, v)),
            None => None,
        }
    }
    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

pub struct IterMut<'a, K, V> {
    inner: RawIterMut<'a, (K, V)>,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    #[inline]
    fn next(&mut self) -> Option<(&'a K, &'a mut V)> {
        match self.inner.next() {
            Some((k, v)) => Some((&*k, v)),
            None => None,
        }
    }
    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}
impl<K, V> FusedIterator for IterMut<'_, K, V> {}

pub struct IntoIter<K, V> {
    inner: RawIntoIter<(K, V)>,
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    #[inline]
    fn next(&mut self) -> Option<(K, V)> {
        self.inner.next()
    }
    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}
impl<K, V> FusedIterator for IntoIter<K, V> {}

pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<K, V> Clone for Keys<'_, K, V> {
    #[inline]
    fn clone(&self) -> Self {
        Keys {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    #[inline]
    fn next(&mut self) -> Option<&'a K> {
        match self.inner.next() {
            Some((k, _)) => Some(k),
            None => None,
        }
    }
    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}
impl<K, V> FusedIterator for Keys<'_, K, V> {}

pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<K, V> Clone for Values<'_, K, V> {
    #[inline]
    fn clone(&self) -> Self {
        Values {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    #[inline]
    fn next(&mut self) -> Option<&'a V> {
        match self.inner.next() {
            Some((_, v)) => Some(v),
            None => None,
        }
    }
    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}
impl<K, V> FusedIterator for Values<'_, K, V> {}

pub struct ValuesMut<'a, K, V> {
    inner: IterMut<'a, K, V>,
}

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;

    #[inline]
    fn next(&mut self) -> Option<&'a mut V> {
        match self.inner.next() {
            Some((_, v)) => Some(v),
            None => None,
        }
    }
    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for ValuesMut<'_, K, V> {}
impl<K, V> FusedIterator for ValuesMut<'_, K, V> {}

impl<K, V, S> IntoIterator for ChainedMap<K, V, S> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    /// Creates a consuming iterator, that is, one that moves each key-value
    /// pair out of the map in bucket order. The map cannot be used after
    /// calling this.
    #[inline]
    fn into_iter(self) -> IntoIter<K, V> {
        IntoIter {
            inner: self.table.into_iter(),
        }
    }
}

impl<'a, K, V, S> IntoIterator for &'a ChainedMap<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    /// Creates an iterator over the entries of a `ChainedMap` in bucket order.
    /// The iterator element type is `(&'a K, &'a V)`.
    #[inline]
    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<'a, K, V, S> IntoIterator for &'a mut ChainedMap<K, V, S> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    #[inline]
    fn into_iter(self) -> IterMut<'a, K, V> {
        self.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use core::hash::{BuildHasherDefault, Hasher};
    use std::{
        cell::RefCell,
        collections::{BTreeSet, TryReserveError},
        rc::Rc,
    };

    use ahash::RandomState;
    use hashbrown::HashMap;
    use proptest::prelude::*;
    use rand::Rng;

    use crate::{raw::BucketArray, ChainedMap, ChainedMapError, DEFAULT_CAPACITY};

    /// Sends every key to bucket 0.
    #[derive(Default)]
    struct ConstantHasher;

    impl Hasher for ConstantHasher {
        fn finish(&self) -> u64 {
            0
        }
        fn write(&mut self, _bytes: &[u8]) {}
    }

    type CollidingMap<K, V> = ChainedMap<K, V, BuildHasherDefault<ConstantHasher>>;

    #[test]
    fn basic_op() {
        let mut map = ChainedMap::<String, String>::default();
        map.insert("hello".to_string(), "world".to_string());
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("hello").unwrap(), "world");
        map.insert("hello2".to_string(), "world2".to_string());
        assert_eq!(map.get("hello2").unwrap(), "world2");
        assert_eq!(map.len(), 2);

        assert_eq!(
            map.remove_entry("hello").unwrap(),
            ("hello".to_string(), "world".to_string())
        );
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("hello2").unwrap(), "world2");
        assert_eq!(map.remove("hello2").unwrap(), "world2".to_string());
        assert_eq!(map.len(), 0);
        assert!(map.get("hello").is_none());
        map.assert_invariants();
    }

    #[test]
    fn twelfth_insert_doubles_default_capacity() {
        let mut map = ChainedMap::<String, usize>::new();
        assert_eq!(map.capacity(), DEFAULT_CAPACITY);
        for i in 0..11 {
            map.insert(format!("key{i}"), i);
        }
        assert_eq!(map.capacity(), 16);
        map.insert("key11".to_string(), 11);
        assert_eq!(map.len(), 12);
        assert_eq!(map.capacity(), 32);
        for i in 0..12 {
            assert_eq!(map[format!("key{i}").as_str()], i);
        }
        map.assert_invariants();
    }

    #[test]
    fn overwrite_keeps_count() {
        let mut map = ChainedMap::<String, &str>::new();
        assert_eq!(map.insert("k1".to_string(), "a"), None);
        assert_eq!(map.insert("k1".to_string(), "b"), Some("a"));
        assert_eq!(map.get("k1"), Some(&"b"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn overwrite_never_grows() {
        let mut map = ChainedMap::<u32, u32>::with_capacity(4);
        for i in 0..2 {
            map.insert(i, i);
        }
        for round in 0..10 {
            map.insert(0, round);
            map.insert(1, round);
        }
        assert_eq!(map.capacity(), 4);
        assert_eq!(map[&0], 9);
    }

    #[test]
    fn remove_middle_key() {
        let mut map = ChainedMap::<String, i32>::new();
        map.insert("k1".to_string(), 1);
        map.insert("k2".to_string(), 2);
        map.insert("k3".to_string(), 3);
        assert_eq!(map.remove("k2"), Some(2));
        assert!(!map.contains_key("k2"));
        assert_eq!(map.len(), 2);

        let seen: BTreeSet<_> = map.iter().map(|(k, v)| (k.clone(), *v)).collect();
        let expected: BTreeSet<_> = [("k1".to_string(), 1), ("k3".to_string(), 3)]
            .into_iter()
            .collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn remove_absent_is_noop() {
        let mut map = ChainedMap::<i32, i32>::new();
        map.insert(1, 1);
        assert_eq!(map.remove(&2), None);
        assert_eq!(map.remove(&2), None);
        assert_eq!(map.len(), 1);
        assert_eq!(map.remove(&1), Some(1));
        assert_eq!(map.remove(&1), None);
        assert!(map.is_empty());
    }

    #[test]
    fn removal_never_shrinks() {
        let mut map = ChainedMap::<i32, i32>::new();
        for i in 0..100 {
            map.insert(i, i);
        }
        let capacity = map.capacity();
        for i in 0..100 {
            map.remove(&i);
        }
        assert_eq!(map.capacity(), capacity);
        map.clear();
        assert_eq!(map.capacity(), capacity);
    }

    #[test]
    fn growth_preserves_entries() {
        let mut map = ChainedMap::<u64, String>::with_capacity(1);
        let mut capacities = vec![map.capacity()];
        for i in 0..1000u64 {
            map.insert(i, i.to_string());
            if *capacities.last().unwrap() != map.capacity() {
                assert_eq!(map.capacity(), capacities.last().unwrap() * 2);
                capacities.push(map.capacity());
            }
            map.assert_invariants();
        }
        assert_eq!(map.capacity(), 2048);
        for i in 0..1000u64 {
            assert_eq!(map.get(&i), Some(&i.to_string()));
        }
    }

    #[test]
    fn zero_capacity_is_raised() {
        let mut map = ChainedMap::<i32, i32>::with_capacity(0);
        assert_eq!(map.capacity(), 1);
        map.insert(1, 1);
        assert_eq!(map.capacity(), 2);
        map.insert(2, 2);
        assert_eq!(map.capacity(), 4);
        map.insert(3, 3);
        assert_eq!(map.capacity(), 8);
        map.assert_invariants();
    }

    #[test]
    fn try_insert_rejects_absent_key() {
        let mut map = ChainedMap::<String, i32>::new();
        assert_eq!(map.try_insert(Some("a".to_string()), 1), Ok(None));
        assert_eq!(map.try_insert(None, 2), Err(ChainedMapError::InvalidKey));
        assert_eq!(map.len(), 1);
        assert_eq!(map.try_insert(Some("a".to_string()), 3), Ok(Some(1)));
        assert_eq!(map["a"], 3);
    }

    #[test]
    fn option_keys_go_through_try_insert() {
        let mut map = ChainedMap::<Option<i32>, &str>::new();
        assert_eq!(map.try_insert(Some(None), "none"), Ok(None));
        assert_eq!(map.try_insert(Some(Some(1)), "one"), Ok(None));
        assert_eq!(map.try_insert(None, "rejected"), Err(ChainedMapError::InvalidKey));
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&None), Some(&"none"));
        assert_eq!(map.get(&Some(1)), Some(&"one"));
    }

    fn failing_alloc<T>(_capacity: usize) -> Result<BucketArray<T>, TryReserveError> {
        Err(Vec::<u8>::new().try_reserve(usize::MAX).unwrap_err())
    }

    #[test]
    fn failed_growth_leaves_map_untouched() {
        let mut map = ChainedMap::<i32, i32>::new();
        for i in 0..11 {
            map.insert(i, i * 10);
        }
        let before = map.clone();
        let err = map.insert_with_alloc(11, 110, failing_alloc).unwrap_err();
        assert!(matches!(err, ChainedMapError::AllocationFailure(_)));
        assert_eq!(map.len(), 11);
        assert_eq!(map.capacity(), DEFAULT_CAPACITY);
        assert!(!map.contains_key(&11));
        assert_eq!(map, before);
        map.assert_invariants();

        // An overwrite never needs to grow, so it gets through the failing allocator.
        assert_eq!(
            map.insert_with_alloc(3, 33, |_| unreachable!("overwrite must not grow")),
            Ok(Some(30))
        );

        assert_eq!(map.try_insert(Some(11), 110), Ok(None));
        assert_eq!(map.capacity(), DEFAULT_CAPACITY * 2);
        assert_eq!(map.len(), 12);
        map.assert_invariants();
    }

    #[test]
    fn colliding_keys_share_one_chain() {
        let mut map = CollidingMap::<i32, i32>::with_capacity_and_hasher(64, Default::default());
        for i in 0..40 {
            map.insert(i, -i);
        }
        let stats = map.bucket_stats();
        assert_eq!(stats.occupied, 1);
        assert_eq!(stats.longest_chain, 40);
        assert_eq!(stats.len, 40);
        for i in 0..40 {
            assert_eq!(map.get(&i), Some(&-i));
        }
        assert_eq!(map.remove(&17), Some(-17));
        assert_eq!(map.get(&18), Some(&-18));
        assert_eq!(map.len(), 39);
        map.assert_invariants();
    }

    #[cfg(feature = "fxhash")]
    #[test]
    fn alternate_hashers() {
        let mut fx = crate::FxChainedMap::<u64, u64>::default();
        let mut a = crate::AChainedMap::<u64, u64>::default();
        for i in 0..100 {
            fx.insert(i, i + 1);
            a.insert(i, i + 1);
        }
        assert_eq!(fx.len(), 100);
        assert_eq!(a[&99], 100);
        fx.assert_invariants();
        a.assert_invariants();
    }

    #[test]
    fn iteration_is_restartable() {
        let map: ChainedMap<i32, i32> = (0..50).map(|i| (i, i * 3)).collect();
        let first = map.iter();
        let again = first.clone();
        assert_eq!(first.len(), 50);
        let a: Vec<_> = first.collect();
        let b: Vec<_> = again.collect();
        let c: Vec<_> = map.iter().collect();
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(map.keys().count(), 50);
        assert_eq!(map.values().copied().sum::<i32>(), (0..50).map(|i| i * 3).sum());
    }

    #[test]
    fn mutate_through_iterators() {
        let mut map: ChainedMap<i32, i32> = (0..10).map(|i| (i, i)).collect();
        for (_, v) in map.iter_mut() {
            *v += 1;
        }
        for v in map.values_mut() {
            *v *= 2;
        }
        if let Some(v) = map.get_mut(&3) {
            *v = 0;
        }
        assert_eq!(map[&3], 0);
        assert_eq!(map[&4], 10);
        assert_eq!(map.get_key_value(&9), Some((&9, &20)));
    }

    #[test]
    fn equality_ignores_capacity() {
        let small: ChainedMap<i32, i32> = (0..5).map(|i| (i, i)).collect();
        let mut large = ChainedMap::<i32, i32>::with_capacity(256);
        for i in (0..5).rev() {
            large.insert(i, i);
        }
        assert_eq!(small, large);
        large.insert(2, 7);
        assert_ne!(small, large);
    }

    #[test]
    fn fuzzing() {
        let mut chained = ChainedMap::<i32, i32>::with_capacity(1);
        let mut hashmap = HashMap::<i32, i32, RandomState>::default();
        for _ in 0..200000 {
            let op = Operation::random();
            op.exec(&mut chained, &mut hashmap);
        }
        chained.assert_invariants();
        let mut ours: Vec<_> = chained.into_iter().collect();
        let mut theirs: Vec<_> = hashmap.into_iter().collect();
        ours.sort_unstable();
        theirs.sort_unstable();
        assert_eq!(ours, theirs);

        enum Operation {
            Insert(i32, i32),
            Remove(i32),
            Get(i32),
            ModifyIfExist(i32, i32),
        }
        impl Operation {
            fn random() -> Self {
                let mut rng = rand::thread_rng();

                let choice: u8 = rng.gen();
                match choice % 4 {
                    0 => Operation::Insert(rng.gen_range(0..512), rng.gen()),
                    1 => Operation::Remove(rng.gen_range(0..512)),
                    2 => Operation::Get(rng.gen_range(0..512)),
                    3 => Operation::ModifyIfExist(rng.gen_range(0..512), rng.gen()),
                    _ => unreachable!(),
                }
            }

            fn exec<S1: core::hash::BuildHasher, S2: core::hash::BuildHasher>(
                self,
                cm: &mut ChainedMap<i32, i32, S1>,
                hm: &mut HashMap<i32, i32, S2>,
            ) {
                match self {
                    Operation::Insert(k, v) => {
                        assert_eq!(cm.insert(k, v), hm.insert(k, v));
                    }
                    Operation::Remove(k) => {
                        assert_eq!(cm.remove(&k), hm.remove(&k));
                    }
                    Operation::Get(k) => {
                        assert_eq!(cm.get(&k), hm.get(&k));
                        assert_eq!(cm.contains_key(&k), hm.contains_key(&k));
                    }
                    Operation::ModifyIfExist(k, nv) => {
                        let (sv, hv) = (cm.get_mut(&k), hm.get_mut(&k));
                        assert_eq!(sv, hv);
                        if let Some(v) = sv {
                            *v = nv;
                        }
                        if let Some(v) = hv {
                            *v = nv;
                        }
                    }
                }
                assert_eq!(cm.len(), hm.len());
            }
        }
    }

    #[derive(Debug, Clone)]
    enum Op {
        Insert(u16, u32),
        Remove(u16),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => (0u16..128, any::<u32>()).prop_map(|(k, v)| Op::Insert(k, v)),
            1 => (0u16..128).prop_map(Op::Remove),
        ]
    }

    proptest! {
        #[test]
        fn len_tracks_distinct_keys(ops in proptest::collection::vec(op_strategy(), 0..400)) {
            let mut map = ChainedMap::<u16, u32>::with_capacity(2);
            let mut model = std::collections::HashMap::new();
            for op in ops {
                match op {
                    Op::Insert(k, v) => {
                        let before = map.capacity();
                        let fresh = !model.contains_key(&k);
                        prop_assert_eq!(map.insert(k, v), model.insert(k, v));
                        if !fresh {
                            prop_assert_eq!(map.capacity(), before);
                        }
                    }
                    Op::Remove(k) => {
                        prop_assert_eq!(map.remove(&k), model.remove(&k));
                    }
                }
                prop_assert_eq!(map.len(), model.len());
                prop_assert!(map.load_factor() < crate::LOAD_FACTOR);
            }
            map.assert_invariants();
            for (k, v) in &model {
                prop_assert_eq!(map.get(k), Some(v));
            }
            prop_assert_eq!(map.iter().count(), model.len());
        }
    }

    #[test]
    fn drop_chk() {
        let (tracked1, checker1) = drop_checker();
        let (tracked2, checker2) = drop_checker();
        let (tracked3, checker3) = drop_checker();
        let mut map = ChainedMap::<_, _>::default();
        map.insert(1, tracked1);
        map.insert(2, tracked2);
        map.insert(3, tracked3);
        assert_eq!(map.len(), 3);
        let mut it = map.into_iter();
        drop(it.next());
        drop(it);
        checker1.assert_drop();
        checker2.assert_drop();
        checker3.assert_drop();

        fn drop_checker() -> (DropProbe, DropChecker) {
            let flag = Rc::new(RefCell::new(false));
            (DropProbe { flag: flag.clone() }, DropChecker { flag })
        }

        struct DropChecker {
            flag: Rc<RefCell<bool>>,
        }

        impl DropChecker {
            fn assert_drop(self) {
                assert!(*self.flag.borrow())
            }
        }

        struct DropProbe {
            flag: Rc<RefCell<bool>>,
        }

        impl Drop for DropProbe {
            fn drop(&mut self) {
                *self.flag.borrow_mut() = true;
            }
        }
    }
}
