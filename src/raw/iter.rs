use core::{iter::FusedIterator, slice};
use std::vec;

use super::Bucket;

/// Walks the bucket array in index order and each chain front to back.
pub(crate) struct RawIter<'a, T> {
    buckets: slice::Iter<'a, Bucket<T>>,
    chain: slice::Iter<'a, T>,
    len: usize,
}

impl<T> Clone for RawIter<'_, T> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            buckets: self.buckets.clone(),
            chain: self.chain.clone(),
            len: self.len,
        }
    }
}

impl<'a, T> RawIter<'a, T> {
    #[inline]
    pub(crate) fn new(buckets: &'a [Bucket<T>], len: usize) -> Self {
        Self {
            buckets: buckets.iter(),
            chain: Default::default(),
            len,
        }
    }
}

impl<'a, T> Iterator for RawIter<'a, T> {
    type Item = &'a T;

    #[inline]
    fn next(&mut self) -> Option<&'a T> {
        loop {
            if let Some(item) = self.chain.next() {
                self.len -= 1;
                return Some(item);
            }
            self.chain = self.buckets.next()?.iter();
        }
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<T> ExactSizeIterator for RawIter<'_, T> {}
impl<T> FusedIterator for RawIter<'_, T> {}

pub(crate) struct RawIterMut<'a, T> {
    buckets: slice::IterMut<'a, Bucket<T>>,
    chain: slice::IterMut<'a, T>,
    len: usize,
}

impl<'a, T> RawIterMut<'a, T> {
    #[inline]
    pub(crate) fn new(buckets: &'a mut [Bucket<T>], len: usize) -> Self {
        Self {
            buckets: buckets.iter_mut(),
            chain: Default::default(),
            len,
        }
    }
}

impl<'a, T> Iterator for RawIterMut<'a, T> {
    type Item = &'a mut T;

    #[inline]
    fn next(&mut self) -> Option<&'a mut T> {
        loop {
            if let Some(item) = self.chain.next() {
                self.len -= 1;
                return Some(item);
            }
            self.chain = self.buckets.next()?.iter_mut();
        }
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<T> ExactSizeIterator for RawIterMut<'_, T> {}
impl<T> FusedIterator for RawIterMut<'_, T> {}

/// Owning counterpart of [`RawIter`]. Elements not yet yielded are dropped
/// together with the iterator.
pub(crate) struct RawIntoIter<T> {
    buckets: vec::IntoIter<Bucket<T>>,
    chain: vec::IntoIter<T>,
    len: usize,
}

impl<T> RawIntoIter<T> {
    #[inline]
    pub(crate) fn new(buckets: Box<[Bucket<T>]>, len: usize) -> Self {
        Self {
            buckets: buckets.into_vec().into_iter(),
            chain: Default::default(),
            len,
        }
    }
}

impl<T> Iterator for RawIntoIter<T> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<T> {
        loop {
            if let Some(item) = self.chain.next() {
                self.len -= 1;
                return Some(item);
            }
            self.chain = self.buckets.next()?.into_iter();
        }
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<T> ExactSizeIterator for RawIntoIter<T> {}
impl<T> FusedIterator for RawIntoIter<T> {}
