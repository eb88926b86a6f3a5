//! Per-worker layer storage with ghost cells.
//!
//! A partition of `n` cells lives in a buffer of `n + 2` values:
//!
//! ```text
//!  index:  0        1 ..= n          n + 1
//!          [ghost L][ owned cells ][ghost R]
//! ```
//!
//! The ghosts hold copies of the neighbouring partitions' edge cells and are
//! only meaningful when the matching `has_*_neighbor` flag is set. A scratch
//! buffer of the same shape backs the relaxation pass.

use crate::debug_invariants::DebugInvariants;
use crate::partitioning::PartitionBounds;
use crate::storm_error::StormError;

/// Below this many cells a rayon split costs more than it saves.
pub(crate) const PAR_MIN_LEN: usize = 4096;

fn zeroed_buffer(len: usize) -> Result<Vec<f32>, StormError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| StormError::Allocation { cells: len })?;
    buf.resize(len, 0.0);
    Ok(buf)
}

/// A worker's partition of the layer plus its relaxation scratch space.
#[derive(Clone, Debug)]
pub struct LocalLayer {
    bounds: PartitionBounds,
    cells: Vec<f32>,
    scratch: Vec<f32>,
}

impl LocalLayer {
    /// Allocate a zeroed partition for `bounds`.
    ///
    /// # Errors
    /// `Allocation` if either buffer cannot be reserved.
    pub fn new(bounds: PartitionBounds) -> Result<Self, StormError> {
        let len = bounds.size + 2;
        Ok(Self {
            bounds,
            cells: zeroed_buffer(len)?,
            scratch: zeroed_buffer(len)?,
        })
    }

    pub fn bounds(&self) -> &PartitionBounds {
        &self.bounds
    }

    /// Number of owned cells.
    pub fn len(&self) -> usize {
        self.bounds.size
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.size == 0
    }

    /// Whole buffer, ghosts included.
    pub fn cells(&self) -> &[f32] {
        &self.cells
    }

    /// Owned cells only.
    pub fn interior(&self) -> &[f32] {
        &self.cells[1..=self.bounds.size]
    }

    pub fn interior_mut(&mut self) -> &mut [f32] {
        let n = self.bounds.size;
        &mut self.cells[1..=n]
    }

    pub fn scratch(&self) -> &[f32] {
        &self.scratch
    }

    /// Live buffer and scratch buffer, borrowed together.
    pub(crate) fn cells_and_scratch_mut(&mut self) -> (&mut [f32], &mut [f32]) {
        (&mut self.cells, &mut self.scratch)
    }

    pub fn left_ghost(&self) -> f32 {
        self.cells[0]
    }

    pub fn right_ghost(&self) -> f32 {
        self.cells[self.bounds.size + 1]
    }

    pub fn set_left_ghost(&mut self, value: f32) {
        self.cells[0] = value;
    }

    pub fn set_right_ghost(&mut self, value: f32) {
        let n = self.bounds.size;
        self.cells[n + 1] = value;
    }

    /// First owned cell (the value the left neighbour needs).
    pub fn first_cell(&self) -> f32 {
        self.cells[1]
    }

    /// Last owned cell (the value the right neighbour needs).
    pub fn last_cell(&self) -> f32 {
        self.cells[self.bounds.size]
    }

    /// Global position of buffer index `k` (`1 ..= len()`).
    #[inline]
    pub fn global_position(&self, k: usize) -> usize {
        self.bounds.start + k - 1
    }
}

impl DebugInvariants for LocalLayer {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "LocalLayer");
    }

    fn validate_invariants(&self) -> Result<(), StormError> {
        let want = self.bounds.size + 2;
        if self.cells.len() != want || self.scratch.len() != want {
            return Err(StormError::InvariantViolation(format!(
                "buffers hold {}/{} values, expected {want}",
                self.cells.len(),
                self.scratch.len()
            )));
        }
        if let Some(k) = self.interior().iter().position(|v| !v.is_finite()) {
            return Err(StormError::InvariantViolation(format!(
                "cell {} is not finite",
                self.global_position(k + 1)
            )));
        }
        Ok(())
    }
}
