use core::slice;
use std::vec;

/// One slot of the bucket array: the chain of entries whose hash reduces to
/// this slot's index.
///
/// An empty chain holds an unallocated `Vec`, so untouched slots cost no heap
/// memory.
#[derive(Clone)]
pub(crate) struct Bucket<T> {
    chain: Vec<T>,
}

impl<T> Default for Bucket<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Bucket<T> {
    #[inline]
    pub(crate) const fn new() -> Self {
        Self { chain: Vec::new() }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.chain.len()
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    #[inline]
    pub(crate) fn find(&self, mut eq: impl FnMut(&T) -> bool) -> Option<&T> {
        self.chain.iter().find(|x| eq(x))
    }

    #[inline]
    pub(crate) fn find_mut(&mut self, mut eq: impl FnMut(&T) -> bool) -> Option<&mut T> {
        self.chain.iter_mut().find(|x| eq(x))
    }

    /// Appends to the end of the chain. The caller guarantees no equal
    /// element is already present.
    #[inline]
    pub(crate) fn push(&mut self, value: T) {
        self.chain.push(value);
    }

    /// Unlinks the first matching element, keeping the order of the rest.
    #[inline]
    pub(crate) fn remove(&mut self, mut eq: impl FnMut(&T) -> bool) -> Option<T> {
        match self.chain.iter().position(|x| eq(x)) {
            Some(index) => Some(self.chain.remove(index)),
            None => None,
        }
    }

    #[inline]
    pub(crate) fn clear(&mut self) {
        self.chain.clear();
    }

    #[inline]
    pub(crate) fn drain(&mut self) -> vec::Drain<'_, T> {
        self.chain.drain(..)
    }

    #[inline]
    pub(crate) fn iter(&self) -> slice::Iter<'_, T> {
        self.chain.iter()
    }

    #[inline]
    pub(crate) fn iter_mut(&mut self) -> slice::IterMut<'_, T> {
        self.chain.iter_mut()
    }
}

impl<T> IntoIterator for Bucket<T> {
    type Item = T;
    type IntoIter = vec::IntoIter<T>;

    #[inline]
    fn into_iter(self) -> vec::IntoIter<T> {
        self.chain.into_iter()
    }
}
