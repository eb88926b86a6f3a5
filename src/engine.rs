//! The per-worker simulation engine.
//!
//! One [`StormEngine`] runs on every worker. Engines advance in lockstep,
//! one storm at a time, through
//! `Deposit → Exchange → Relax → LocalMax → GlobalReduce → Done`,
//! reusing the partition buffers allocated at start-up.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use crate::algs::communicator::{CommTag, Communicator, HaloTags, RayonComm};
use crate::algs::halo::exchange_ghosts;
use crate::algs::reduction::global_maximum;
use crate::data::layer::LocalLayer;
use crate::data::storm::Storm;
use crate::debug_invariants::DebugInvariants;
use crate::partitioning::{PartitionBounds, partition_for};
use crate::physics::attenuation::{Normalization, THRESHOLD};
use crate::physics::deposit::{DepositParams, Deposition, deposit_storm};
use crate::physics::relax::{LocalMaximum, find_local_maximum, relax};
use crate::storm_error::StormError;

/// Ghosts after deposition feed the relaxation.
const DEPOSIT_HALO: CommTag = CommTag::new(0x5700);
/// Ghosts after relaxation feed the maximum search.
const RELAX_HALO: CommTag = CommTag::new(0x5710);

/// Engine configuration shared by every worker of a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of cells in the global layer.
    pub layer_size: usize,
    /// Noise floor for attenuated contributions.
    pub threshold: f32,
    pub normalization: Normalization,
    pub deposition: Deposition,
    /// Threads in this worker's pool; `None` uses the global rayon pool.
    pub threads: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            layer_size: 0,
            threshold: THRESHOLD,
            normalization: Normalization::default(),
            deposition: Deposition::default(),
            threads: None,
        }
    }
}

impl EngineConfig {
    pub fn new(layer_size: usize) -> Self {
        Self {
            layer_size,
            ..Default::default()
        }
    }

    /// Check the settings that do not depend on the worker.
    pub fn validate(&self) -> Result<(), StormError> {
        if self.layer_size == 0 {
            return Err(StormError::InvalidLayerSize(self.layer_size));
        }
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(StormError::InvalidThreshold(self.threshold));
        }
        if self.threads == Some(0) {
            return Err(StormError::ThreadPool("a worker needs at least one thread".to_string()));
        }
        Ok(())
    }
}

/// Position and value of the maximum left by one storm.
///
/// A storm that leaves no positive local maximum reports position 0 and
/// value 0.0.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StormResult {
    pub position: usize,
    pub value: f32,
}

impl From<Option<LocalMaximum>> for StormResult {
    fn from(max: Option<LocalMaximum>) -> Self {
        max.map(|m| StormResult {
            position: m.position,
            value: m.value,
        })
        .unwrap_or_default()
    }
}

/// Phases a storm goes through on every worker.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StormPhase {
    Deposit,
    Exchange,
    Relax,
    LocalMax,
    GlobalReduce,
    Done,
}

impl fmt::Display for StormPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StormPhase::Deposit => "deposit",
            StormPhase::Exchange => "exchange",
            StormPhase::Relax => "relax",
            StormPhase::LocalMax => "local-max",
            StormPhase::GlobalReduce => "global-reduce",
            StormPhase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Run `op` inside the worker's pool, or on the global pool.
fn in_pool<R: Send>(pool: Option<&rayon::ThreadPool>, op: impl FnOnce() -> R + Send) -> R {
    match pool {
        Some(pool) => pool.install(op),
        None => op(),
    }
}

/// Simulation state owned by one worker.
pub struct StormEngine<C: Communicator> {
    config: EngineConfig,
    comm: C,
    layer: LocalLayer,
    pool: Option<rayon::ThreadPool>,
    params: DepositParams,
    phase: StormPhase,
}

impl<C: Communicator> StormEngine<C> {
    /// Partition the layer for `comm`'s rank and allocate the buffers.
    ///
    /// # Errors
    /// Configuration errors for invalid settings or a worker left without
    /// cells, `Allocation` when the buffers cannot be reserved.
    pub fn new(config: EngineConfig, comm: C) -> Result<Self, StormError> {
        config.validate()?;
        let bounds = partition_for(config.layer_size, comm.size(), comm.rank())?;
        // every worker must own at least one cell
        if comm.size() > config.layer_size {
            return Err(StormError::TooManyWorkers {
                workers: comm.size(),
                layer_size: config.layer_size,
            });
        }
        let layer = LocalLayer::new(bounds)?;
        let pool = match config.threads {
            Some(n) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| StormError::ThreadPool(e.to_string()))?,
            ),
            None => None,
        };
        let params = DepositParams {
            normalizer: config.normalization.normalizer(&bounds, config.layer_size),
            threshold: config.threshold,
            strategy: config.deposition,
        };
        log::debug!(
            "rank {}/{}: cells [{}, {}), {:?} normalization, {:?} deposition",
            bounds.rank,
            bounds.workers,
            bounds.start,
            bounds.end(),
            config.normalization,
            config.deposition
        );
        Ok(Self {
            config,
            comm,
            layer,
            pool,
            params,
            phase: StormPhase::Done,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn bounds(&self) -> &PartitionBounds {
        self.layer.bounds()
    }

    pub fn layer(&self) -> &LocalLayer {
        &self.layer
    }

    pub fn comm(&self) -> &C {
        &self.comm
    }

    /// Phase of the storm in progress, `Done` between storms.
    pub fn phase(&self) -> StormPhase {
        self.phase
    }

    /// Rank 0 records and reports the results.
    pub fn is_coordinator(&self) -> bool {
        self.comm.rank() == 0
    }

    fn enter(&mut self, phase: StormPhase) {
        log::trace!("rank {}: {} -> {}", self.comm.rank(), self.phase, phase);
        self.phase = phase;
    }

    /// Apply one storm and return the global maximum it leaves.
    ///
    /// Collective: every worker must step through the same storm.
    pub fn step(&mut self, storm: &Storm) -> Result<StormResult, StormError> {
        let params = self.params;

        self.enter(StormPhase::Deposit);
        in_pool(self.pool.as_ref(), || deposit_storm(&mut self.layer, storm, &params));

        self.enter(StormPhase::Exchange);
        exchange_ghosts(&mut self.layer, &self.comm, HaloTags::from_base(DEPOSIT_HALO))?;

        self.enter(StormPhase::Relax);
        in_pool(self.pool.as_ref(), || relax(&mut self.layer));

        self.enter(StormPhase::LocalMax);
        exchange_ghosts(&mut self.layer, &self.comm, HaloTags::from_base(RELAX_HALO))?;
        let local = in_pool(self.pool.as_ref(), || find_local_maximum(&self.layer));

        self.enter(StormPhase::GlobalReduce);
        let global = global_maximum(local, &self.comm)?;

        self.enter(StormPhase::Done);
        self.layer.debug_assert_invariants();
        Ok(StormResult::from(global))
    }

    /// Run every storm in order, one result per storm.
    ///
    /// All storms are validated before the first one is applied, so a bad
    /// impact never leaves partial results behind.
    pub fn run(&mut self, storms: &[Storm]) -> Result<Vec<StormResult>, StormError> {
        for (i, storm) in storms.iter().enumerate() {
            storm.validate(i, self.config.layer_size)?;
            if storm.is_empty() && self.is_coordinator() {
                log::warn!("storm {i} has no impacts");
            }
        }
        let mut results = Vec::with_capacity(storms.len());
        for (i, storm) in storms.iter().enumerate() {
            let result = self.step(storm)?;
            log::debug!(
                "rank {}: storm {i} -> position {} value {}",
                self.comm.rank(),
                result.position,
                result.value
            );
            results.push(result);
        }
        Ok(results)
    }
}

/// Run `workers` engines on threads of this process, connected by a
/// [`RayonComm`] world, and return the coordinator's results.
///
/// A failing or panicking worker aborts the others; the error that caused
/// the abort is returned.
pub fn simulate_in_process(
    config: &EngineConfig,
    storms: &[Storm],
    workers: usize,
) -> Result<Vec<StormResult>, StormError> {
    if workers == 0 {
        return Err(StormError::InvalidWorkerCount(workers));
    }
    let outcomes: Vec<Result<Vec<StormResult>, StormError>> = std::thread::scope(|s| {
        let handles: Vec<_> = RayonComm::world(workers)
            .into_iter()
            .map(|comm| {
                let config = config.clone();
                s.spawn(move || {
                    let guard = comm.clone();
                    let rank = comm.rank();
                    // a panicking worker must still release its peers
                    let out = panic::catch_unwind(AssertUnwindSafe(|| {
                        StormEngine::new(config, comm).and_then(|mut engine| engine.run(storms))
                    }))
                    .unwrap_or(Err(StormError::WorkerPanicked(rank)));
                    if let Err(e) = &out {
                        guard.abort(&e.to_string());
                    }
                    out
                })
            })
            .collect();
        handles
            .into_iter()
            .enumerate()
            .map(|(rank, h)| h.join().unwrap_or(Err(StormError::WorkerPanicked(rank))))
            .collect()
    });

    let mut first_secondary = None;
    let mut coordinator = None;
    for (rank, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok(results) if rank == 0 => coordinator = Some(results),
            Ok(_) => {}
            Err(e) if e.is_secondary() => {
                first_secondary.get_or_insert(e);
            }
            Err(e) => return Err(e),
        }
    }
    match (first_secondary, coordinator) {
        (Some(e), _) => Err(e),
        (None, Some(results)) => Ok(results),
        (None, None) => Err(StormError::WorkerPanicked(0)),
    }
}
