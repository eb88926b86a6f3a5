//! StormError: unified error type for energy-storms public APIs
//!
//! Every failure in the simulation core is fatal to the run: configuration
//! problems are caught before the first storm, and communication problems
//! abort every worker. No variant is retried.

use thiserror::Error;

/// Unified error type for energy-storms operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StormError {
    /// A setting could not be parsed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    /// The layer must contain at least one cell.
    #[error("Invalid layer size {0}: the layer needs at least one cell")]
    InvalidLayerSize(usize),
    /// At least one worker is required to own the layer.
    #[error("Invalid worker count {0}: at least one worker is required")]
    InvalidWorkerCount(usize),
    /// A rank was asked for a partition it cannot own.
    #[error("Rank {rank} is out of range for {workers} workers")]
    RankOutOfRange { rank: usize, workers: usize },
    /// More workers than cells would leave a worker without a partition.
    #[error("{workers} workers cannot share a layer of {layer_size} cells")]
    TooManyWorkers { workers: usize, layer_size: usize },
    /// An impact lands outside the layer.
    #[error("Storm {storm}: impact position {position} is outside a layer of {layer_size} cells")]
    ImpactOutOfBounds {
        storm: usize,
        position: usize,
        layer_size: usize,
    },
    /// The noise-floor threshold must be finite and non-negative.
    #[error("Invalid threshold {0}: expected a finite, non-negative value")]
    InvalidThreshold(f32),
    /// Partition or scratch buffer could not be allocated.
    #[error("Allocation of {cells} layer cells failed")]
    Allocation { cells: usize },
    /// The per-worker thread pool could not be built.
    #[error("Thread pool error: {0}")]
    ThreadPool(String),
    /// A point-to-point or collective operation failed.
    #[error("Communication error: {0}")]
    Comm(String),
    /// A received message did not have the expected length.
    #[error("Message from rank {peer} has {got} bytes, expected {expected}")]
    MessageLength {
        peer: usize,
        expected: usize,
        got: usize,
    },
    /// Another worker aborted the run.
    #[error("Run aborted: {0}")]
    Aborted(String),
    /// A worker thread panicked.
    #[error("Worker {0} panicked")]
    WorkerPanicked(usize),
    /// A storm file could not be read.
    #[error("I/O error on `{path}`: {reason}")]
    Io { path: String, reason: String },
    /// A storm description is not in the expected format.
    #[error("Malformed storm description: {0}")]
    MalformedStorm(String),
    /// Layer buffers are in an inconsistent state.
    #[error("Layer invariant violated: {0}")]
    InvariantViolation(String),
}

impl StormError {
    /// True for errors that only echo a failure raised by another worker.
    pub fn is_secondary(&self) -> bool {
        matches!(self, StormError::Aborted(_))
    }
}
