use std::collections::TryReserveError;

use log::trace;

mod bucket;
pub mod iter;
pub mod util;

pub(crate) use self::bucket::Bucket;
use self::{
    iter::{RawIntoIter, RawIter, RawIterMut},
    util::bucket_index,
};

/// Numerator and denominator of the load factor. Growth is triggered once
/// `len / capacity` would reach `3 / 4`; integer arithmetic keeps the
/// boundary exact.
const LOAD_FACTOR_NUM: usize = 3;
const LOAD_FACTOR_DEN: usize = 4;

/// Snapshot of how entries are spread over the bucket array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketStats {
    /// Number of buckets in the array.
    pub capacity: usize,
    /// Buckets holding at least one entry.
    pub occupied: usize,
    /// Length of the longest chain.
    pub longest_chain: usize,
    /// Total number of entries.
    pub len: usize,
}

/// Bucket array with chained collision resolution.
///
/// The table knows nothing about keys: callers pass the element hash and an
/// equality closure, and a hasher closure when the table has to grow.
#[derive(Clone)]
pub(crate) struct RawTable<T> {
    buckets: BucketArray<T>,
    len: usize,
}

pub(crate) type BucketArray<T> = Box<[Bucket<T>]>;

/// Allocates `capacity` empty buckets, reporting failure instead of aborting.
pub(crate) fn alloc_buckets<T>(capacity: usize) -> Result<BucketArray<T>, TryReserveError> {
    let mut buckets = Vec::new();
    buckets.try_reserve_exact(capacity)?;
    buckets.resize_with(capacity, Bucket::new);
    Ok(buckets.into_boxed_slice())
}

impl<T> RawTable<T> {
    /// Creates a table with `capacity` buckets (at least one).
    pub(crate) fn try_with_capacity(capacity: usize) -> Result<Self, TryReserveError> {
        Ok(Self {
            buckets: alloc_buckets(capacity.max(1))?,
            len: 0,
        })
    }

    /// Infallible variant of [`RawTable::try_with_capacity`].
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut buckets = Vec::with_capacity(capacity);
        buckets.resize_with(capacity, Bucket::new);
        Self {
            buckets: buckets.into_boxed_slice(),
            len: 0,
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.buckets.len()
    }

    /// Whether adding one more element reaches the load factor threshold.
    #[inline]
    pub(crate) fn needs_grow_for_one_more(&self) -> bool {
        (self.len + 1).saturating_mul(LOAD_FACTOR_DEN)
            >= self.capacity().saturating_mul(LOAD_FACTOR_NUM)
    }

    #[inline]
    fn bucket(&self, hash: u64) -> &Bucket<T> {
        &self.buckets[bucket_index(hash, self.buckets.len())]
    }

    #[inline]
    fn bucket_mut(&mut self, hash: u64) -> &mut Bucket<T> {
        let index = bucket_index(hash, self.buckets.len());
        &mut self.buckets[index]
    }

    /// Searches the chain `hash` selects for an element matching `eq`.
    #[inline]
    pub(crate) fn get(&self, hash: u64, eq: impl FnMut(&T) -> bool) -> Option<&T> {
        self.bucket(hash).find(eq)
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, hash: u64, eq: impl FnMut(&T) -> bool) -> Option<&mut T> {
        self.bucket_mut(hash).find_mut(eq)
    }

    /// Appends an element without checking for duplicates or load factor.
    #[inline]
    pub(crate) fn insert_unique(&mut self, hash: u64, value: T) {
        self.bucket_mut(hash).push(value);
        self.len += 1;
    }

    /// Removes and returns the matching element. Never shrinks the table.
    #[inline]
    pub(crate) fn remove(&mut self, hash: u64, eq: impl FnMut(&T) -> bool) -> Option<T> {
        let removed = self.bucket_mut(hash).remove(eq);
        if removed.is_some() {
            self.len -= 1;
        }
        removed
    }

    /// Doubles the bucket array and moves every element into the new one.
    #[cfg(test)]
    pub(crate) fn grow(&mut self, hasher: impl Fn(&T) -> u64) -> Result<(), TryReserveError> {
        self.grow_with(hasher, alloc_buckets)
    }

    /// Doubles the bucket array, taking the new array from `alloc`.
    ///
    /// The new array is allocated before anything is moved, so on failure the
    /// table is left untouched.
    pub(crate) fn grow_with(
        &mut self,
        hasher: impl Fn(&T) -> u64,
        alloc: impl FnOnce(usize) -> Result<BucketArray<T>, TryReserveError>,
    ) -> Result<(), TryReserveError> {
        let new_capacity = self.capacity().saturating_mul(2);
        let mut new_buckets = alloc(new_capacity)?;
        debug_assert_eq!(new_buckets.len(), new_capacity);

        for bucket in self.buckets.iter_mut() {
            for item in bucket.drain() {
                let index = bucket_index(hasher(&item), new_capacity);
                new_buckets[index].push(item);
            }
        }
        trace!(
            "grew bucket array from {} to {} buckets holding {} entries",
            self.buckets.len(),
            new_capacity,
            self.len
        );
        self.buckets = new_buckets;
        Ok(())
    }

    /// Drops every element; the bucket array keeps its size.
    pub(crate) fn clear(&mut self) {
        for bucket in self.buckets.iter_mut() {
            bucket.clear();
        }
        self.len = 0;
    }

    pub(crate) fn stats(&self) -> BucketStats {
        let mut occupied = 0;
        let mut longest_chain = 0;
        for bucket in self.buckets.iter().filter(|b| !b.is_empty()) {
            occupied += 1;
            longest_chain = longest_chain.max(bucket.len());
        }
        BucketStats {
            capacity: self.capacity(),
            occupied,
            longest_chain,
            len: self.len,
        }
    }

    #[inline]
    pub(crate) fn iter(&self) -> RawIter<'_, T> {
        RawIter::new(&self.buckets, self.len)
    }

    #[inline]
    pub(crate) fn iter_mut(&mut self) -> RawIterMut<'_, T> {
        RawIterMut::new(&mut self.buckets, self.len)
    }

    /// Panics if an element sits in a bucket its hash does not select, or if
    /// the cached length is stale.
    #[cfg(test)]
    pub(crate) fn assert_placement(&self, hasher: impl Fn(&T) -> u64) {
        let mut total = 0;
        for (index, bucket) in self.buckets.iter().enumerate() {
            for item in bucket.iter() {
                assert_eq!(bucket_index(hasher(item), self.buckets.len()), index);
            }
            total += bucket.len();
        }
        assert_eq!(total, self.len);
    }
}

impl<T> IntoIterator for RawTable<T> {
    type Item = T;
    type IntoIter = RawIntoIter<T>;

    #[inline]
    fn into_iter(self) -> RawIntoIter<T> {
        RawIntoIter::new(self.buckets, self.len)
    }
}
