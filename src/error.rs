use std::collections::TryReserveError;

use thiserror::Error;

/// Errors surfaced by [`ChainedMap`](crate::ChainedMap) and the comparison
/// harness.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainedMapError {
    /// An insertion was attempted without a key.
    #[error("key must not be absent")]
    InvalidKey,

    /// The bucket array could not be allocated. The map is unchanged.
    #[error("failed to allocate bucket array: {0}")]
    AllocationFailure(#[from] TryReserveError),

    /// The harness was asked for a workload size outside `1..=max`.
    #[error("item count {item_count} must be between 1 and {max}")]
    InvalidItemCount { item_count: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, ChainedMapError>;
