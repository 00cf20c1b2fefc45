//! Side-by-side timing of [`ChainedMap`] against `hashbrown::HashMap`.
//!
//! Both maps are fed the same seeded workload: every pair is inserted, every
//! key is looked up once, and the first half of the keys is removed.

use core::hash::BuildHasher;
use std::{
    fmt,
    hint::black_box,
    time::{Duration, Instant},
};

use log::{debug, info};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{ChainedMap, ChainedMapError, Result};

/// Seed used unless a [`HarnessConfig`] says otherwise.
pub const DEFAULT_SEED: u64 = 42;

/// Largest workload accepted unless a [`HarnessConfig`] says otherwise.
pub const MAX_ITEM_COUNT: usize = 100_000;

/// Upper bound (exclusive) of the random suffix appended to every key.
const KEY_SUFFIX_RANGE: u32 = 10_000;
/// Upper bound (exclusive) of the generated values.
const VALUE_RANGE: u32 = 1_000_000;

/// The operations the harness needs from a map under test.
pub trait MapUnderTest {
    /// Label used in logs and reports.
    const NAME: &'static str;

    fn insert(&mut self, key: String, value: u32);
    fn lookup(&self, key: &str) -> Option<&u32>;
    fn remove(&mut self, key: &str) -> bool;
    fn len(&self) -> usize;
    fn capacity(&self) -> usize;
}

impl<S: BuildHasher> MapUnderTest for ChainedMap<String, u32, S> {
    const NAME: &'static str = "ChainedMap";

    #[inline]
    fn insert(&mut self, key: String, value: u32) {
        ChainedMap::insert(self, key, value);
    }
    #[inline]
    fn lookup(&self, key: &str) -> Option<&u32> {
        self.get(key)
    }
    #[inline]
    fn remove(&mut self, key: &str) -> bool {
        ChainedMap::remove(self, key).is_some()
    }
    #[inline]
    fn len(&self) -> usize {
        ChainedMap::len(self)
    }
    #[inline]
    fn capacity(&self) -> usize {
        ChainedMap::capacity(self)
    }
}

impl<S: BuildHasher> MapUnderTest for hashbrown::HashMap<String, u32, S> {
    const NAME: &'static str = "hashbrown::HashMap";

    #[inline]
    fn insert(&mut self, key: String, value: u32) {
        hashbrown::HashMap::insert(self, key, value);
    }
    #[inline]
    fn lookup(&self, key: &str) -> Option<&u32> {
        self.get(key)
    }
    #[inline]
    fn remove(&mut self, key: &str) -> bool {
        hashbrown::HashMap::remove(self, key).is_some()
    }
    #[inline]
    fn len(&self) -> usize {
        hashbrown::HashMap::len(self)
    }
    #[inline]
    fn capacity(&self) -> usize {
        hashbrown::HashMap::capacity(self)
    }
}

/// Hasher shared by both maps. Its keys are fixed by the harness seed, so a
/// repeated run lays entries (and hashbrown's deleted slots) out identically.
type HarnessHasher = ahash::RandomState;

type Chained = ChainedMap<String, u32, HarnessHasher>;
type Baseline = hashbrown::HashMap<String, u32, HarnessHasher>;

/// Deterministic key/value pairs for one harness run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workload {
    pairs: Vec<(String, u32)>,
}

impl Workload {
    /// Draws `item_count` pairs from a generator seeded with `seed`.
    ///
    /// Keys look like `Key_{i}_{r}`; the index makes them unique.
    pub fn generate(item_count: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let pairs = (0..item_count)
            .map(|i| {
                let key = format!("Key_{}_{}", i, rng.gen_range(0..KEY_SUFFIX_RANGE));
                let value = rng.gen_range(0..VALUE_RANGE);
                (key, value)
            })
            .collect();
        Self { pairs }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    #[inline]
    pub fn pairs(&self) -> &[(String, u32)] {
        &self.pairs
    }
}

/// Timings and final shape of one map after a harness run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PerformanceMetrics {
    #[cfg_attr(feature = "serde", serde(rename = "insert_time_ms", serialize_with = "as_millis"))]
    pub insert_time: Duration,
    #[cfg_attr(feature = "serde", serde(rename = "search_time_ms", serialize_with = "as_millis"))]
    pub search_time: Duration,
    #[cfg_attr(feature = "serde", serde(rename = "remove_time_ms", serialize_with = "as_millis"))]
    pub remove_time: Duration,
    /// Lookups that found their key during the search phase.
    pub search_hits: usize,
    pub final_count: usize,
    pub capacity: usize,
}

impl PerformanceMetrics {
    #[inline]
    pub fn insert_ms(&self) -> u128 {
        self.insert_time.as_millis()
    }

    #[inline]
    pub fn search_ms(&self) -> u128 {
        self.search_time.as_millis()
    }

    #[inline]
    pub fn remove_ms(&self) -> u128 {
        self.remove_time.as_millis()
    }
}

#[cfg(feature = "serde")]
fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> core::result::Result<S::Ok, S::Error> {
    s.serialize_u128(d.as_millis())
}

/// Outcome of [`compare_performance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ComparisonResult {
    pub item_count: usize,
    pub chained: PerformanceMetrics,
    pub baseline: PerformanceMetrics,
}

impl fmt::Display for ComparisonResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "items: {}", self.item_count)?;
        writeln!(
            f,
            "{:<20} {:>10} {:>10} {:>10} {:>8} {:>10}",
            "map", "insert ms", "search ms", "remove ms", "count", "capacity"
        )?;
        for (name, m) in [
            (Chained::NAME, &self.chained),
            (Baseline::NAME, &self.baseline),
        ] {
            writeln!(
                f,
                "{:<20} {:>10} {:>10} {:>10} {:>8} {:>10}",
                name,
                m.insert_ms(),
                m.search_ms(),
                m.remove_ms(),
                m.final_count,
                m.capacity
            )?;
        }
        Ok(())
    }
}

/// Knobs for a harness run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarnessConfig {
    pub seed: u64,
    pub max_item_count: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            max_item_count: MAX_ITEM_COUNT,
        }
    }
}

impl HarnessConfig {
    /// Rejects workload sizes outside `1..=max_item_count`.
    pub fn validate(&self, item_count: usize) -> Result<()> {
        if item_count == 0 || item_count > self.max_item_count {
            return Err(ChainedMapError::InvalidItemCount {
                item_count,
                max: self.max_item_count,
            });
        }
        Ok(())
    }

    fn hasher(&self) -> HarnessHasher {
        ahash::RandomState::with_seeds(
            self.seed,
            self.seed.rotate_left(16),
            self.seed.rotate_left(32),
            self.seed.rotate_left(48),
        )
    }

    /// Runs the workload against both maps and collects their metrics.
    pub fn compare(&self, item_count: usize) -> Result<ComparisonResult> {
        self.validate(item_count)?;
        let workload = Workload::generate(item_count, self.seed);
        debug!("generated {} pairs with seed {}", workload.len(), self.seed);

        let chained = run_phases(Chained::with_hasher(self.hasher()), &workload);
        let baseline = run_phases(Baseline::with_hasher(self.hasher()), &workload);
        info!(
            "compared {} items: chained insert {:?}, baseline insert {:?}",
            item_count, chained.insert_time, baseline.insert_time
        );

        Ok(ComparisonResult {
            item_count,
            chained,
            baseline,
        })
    }
}

/// Compares [`ChainedMap`] with `hashbrown::HashMap` over `item_count`
/// seeded pairs, using [`HarnessConfig::default`].
///
/// # Examples
///
/// ```
/// use chain_map::compare::compare_performance;
///
/// let result = compare_performance(1000).unwrap();
/// assert_eq!(result.chained.final_count, 500);
/// assert_eq!(result.baseline.final_count, 500);
/// assert_eq!(result.chained.capacity, 2048);
/// assert!(compare_performance(0).is_err());
/// ```
pub fn compare_performance(item_count: usize) -> Result<ComparisonResult> {
    HarnessConfig::default().compare(item_count)
}

#[inline]
fn measure(f: impl FnOnce()) -> Duration {
    let start = Instant::now();
    f();
    start.elapsed()
}

fn run_phases<M>(mut map: M, workload: &Workload) -> PerformanceMetrics
where
    M: MapUnderTest,
{
    // Owned copies are made up front so cloning is not timed.
    let owned = workload.pairs.clone();
    let insert_time = measure(|| {
        for (key, value) in owned {
            map.insert(key, value);
        }
    });

    let mut search_hits = 0;
    let search_time = measure(|| {
        for (key, _) in &workload.pairs {
            if black_box(map.lookup(key.as_str())).is_some() {
                search_hits += 1;
            }
        }
    });

    let remove_time = measure(|| {
        for (key, _) in &workload.pairs[..workload.len() / 2] {
            black_box(map.remove(key.as_str()));
        }
    });

    debug!(
        "{}: insert {:?}, search {:?}, remove {:?}, {} left in {} slots",
        M::NAME,
        insert_time,
        search_time,
        remove_time,
        map.len(),
        map.capacity()
    );

    PerformanceMetrics {
        insert_time,
        search_time,
        remove_time,
        search_hits,
        final_count: map.len(),
        capacity: map.capacity(),
    }
}
