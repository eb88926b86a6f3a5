//! Block decomposition of the 1-D layer over workers.
//!
//! Every worker owns one contiguous run of cells. The remainder of
//! `layer_size / workers` is handed out one cell at a time to the lowest
//! ranks, so any two partitions differ by at most one cell.

use serde::{Deserialize, Serialize};

use crate::storm_error::StormError;

#[cfg(test)]
mod tests;

/// The slice of the global layer owned by one worker.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionBounds {
    /// Rank owning this partition.
    pub rank: usize,
    /// Number of workers sharing the layer.
    pub workers: usize,
    /// Global index of the first owned cell.
    pub start: usize,
    /// Number of owned cells.
    pub size: usize,
    /// A lower rank owns the cells to the left.
    pub has_left_neighbor: bool,
    /// A higher rank owns the cells to the right.
    pub has_right_neighbor: bool,
}

impl PartitionBounds {
    /// One past the global index of the last owned cell.
    pub fn end(&self) -> usize {
        self.start + self.size
    }

    /// Whether the global cell `k` belongs to this partition.
    pub fn contains(&self, k: usize) -> bool {
        (self.start..self.end()).contains(&k)
    }

    /// Rank of the left neighbour, if any.
    pub fn left_rank(&self) -> Option<usize> {
        self.has_left_neighbor.then(|| self.rank - 1)
    }

    /// Rank of the right neighbour, if any.
    pub fn right_rank(&self) -> Option<usize> {
        self.has_right_neighbor.then(|| self.rank + 1)
    }
}

/// Compute the partition of `rank` when `layer_size` cells are split across
/// `workers` workers.
///
/// Partitions may be empty when there are more workers than cells; callers
/// that need a cell per worker must check [`PartitionBounds::size`].
///
/// # Errors
/// `InvalidLayerSize` / `InvalidWorkerCount` for zero inputs and
/// `RankOutOfRange` for `rank >= workers`.
pub fn partition_for(
    layer_size: usize,
    workers: usize,
    rank: usize,
) -> Result<PartitionBounds, StormError> {
    if layer_size == 0 {
        return Err(StormError::InvalidLayerSize(layer_size));
    }
    if workers == 0 {
        return Err(StormError::InvalidWorkerCount(workers));
    }
    if rank >= workers {
        return Err(StormError::RankOutOfRange { rank, workers });
    }
    let base = layer_size / workers;
    let rest = layer_size % workers;
    Ok(PartitionBounds {
        rank,
        workers,
        start: rank * base + rank.min(rest),
        size: base + usize::from(rank < rest),
        has_left_neighbor: rank > 0,
        has_right_neighbor: rank + 1 < workers,
    })
}

/// All partitions of the layer, in rank order.
pub fn partition_all(layer_size: usize, workers: usize) -> Result<Vec<PartitionBounds>, StormError> {
    (0..workers.max(1))
        .map(|rank| partition_for(layer_size, workers, rank))
        .collect()
}
