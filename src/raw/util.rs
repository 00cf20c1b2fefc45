use core::hash::{BuildHasher, Hash};

use crate::Equivalent;

/// Equality closure the raw table runs over a chain: matches a stored pair
/// whose key is equivalent to the borrowed lookup key `k`.
#[inline]
pub(crate) fn equivalent_key<Q, K, V>(k: &Q) -> impl Fn(&(K, V)) -> bool + '_
where
    Q: ?Sized + Equivalent<K>,
{
    move |x| k.equivalent(&x.0)
}

#[inline]
pub(crate) fn make_hash<Q, S>(hash_builder: &S, val: &Q) -> u64
where
    Q: Hash + ?Sized,
    S: BuildHasher,
{
    use core::hash::Hasher;
    let mut state = hash_builder.build_hasher();
    val.hash(&mut state);
    state.finish()
}

/// Hashes the key half of a stored pair; used when rehoming entries on growth.
#[inline]
pub(crate) fn make_hasher<K, V, S>(hash_builder: &S) -> impl Fn(&(K, V)) -> u64 + '_
where
    K: Hash,
    S: BuildHasher,
{
    move |val| make_hash::<K, S>(hash_builder, &val.0)
}

/// Reduces a hash into `0..capacity`.
///
/// Hashes are unsigned, so the plain remainder is already non-negative.
#[inline]
pub(crate) fn bucket_index(hash: u64, capacity: usize) -> usize {
    debug_assert!(capacity > 0);
    (hash % capacity as u64) as usize
}
