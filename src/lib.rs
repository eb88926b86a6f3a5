#![cfg_attr(docsrs, feature(doc_cfg))]
//! # energy-storms
//!
//! energy-storms simulates sequences of high-energy particle storms hitting a
//! 1-D layer and reports, per storm, the position and value of the highest
//! local energy maximum. It is a benchmark for combined distributed and
//! shared-memory parallelism: the layer is block-partitioned across workers
//! that exchange ghost cells with their rank neighbours, while each worker
//! spreads its own cells over a rayon thread pool.
//!
//! ## Features
//! - Block partitioning with the remainder spread over the lowest ranks
//! - Race-free deposition of every impact onto every cell
//! - Ghost-cell exchange through pluggable communication backends (serial,
//!   in-process threads, MPI)
//! - 3-point relaxation and a deterministic two-level maximum reduction
//!
//! ## Determinism
//!
//! Cell values never depend on the thread count, and with the default
//! [`Normalization::Layer`](physics::Normalization::Layer) they do not depend
//! on the worker count either. Maxima are merged with a total order (value,
//! then lowest position), so every run over the same storms reports the same
//! results.
//!
//! ## Usage
//! ```
//! use energy_storms::prelude::*;
//!
//! let storms = vec![Storm::from_pairs(&[(5, 1.0)])];
//! let mut engine = StormEngine::new(EngineConfig::new(10), NoComm).unwrap();
//! let results = engine.run(&storms).unwrap();
//! assert_eq!(results[0].position, 5);
//! ```
//!
//! Enable the `mpi-support` feature for [`MpiComm`](algs::communicator::MpiComm)
//! and run the `energy_storms` binary under `mpirun`.

pub mod algs;
pub mod data;
pub mod debug_invariants;
pub mod engine;
pub mod io;
pub mod partitioning;
pub mod physics;
pub mod storm_error;

pub use debug_invariants::DebugInvariants;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algs::communicator::{CommTag, Communicator, HaloTags, NoComm, RayonComm};
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiComm;
    pub use crate::data::{Impact, LocalLayer, Storm};
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::engine::{EngineConfig, StormEngine, StormPhase, StormResult, simulate_in_process};
    pub use crate::io::{RunReport, read_storm_file};
    pub use crate::partitioning::{PartitionBounds, partition_all, partition_for};
    pub use crate::physics::{Deposition, LocalMaximum, Normalization};
    pub use crate::storm_error::StormError;
}
