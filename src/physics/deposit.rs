//! Energy deposition: every impact of a storm touches every owned cell.
//!
//! Both strategies are race-free and give the same bits for any thread
//! count; they differ only in how the work is split.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::data::layer::{LocalLayer, PAR_MIN_LEN};
use crate::data::storm::Storm;
use crate::physics::attenuation::update_control_point;

/// Impacts per private accumulator in [`Deposition::ImpactMajor`].
pub const IMPACT_CHUNK: usize = 64;

/// How deposition work is split across threads.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Deposition {
    /// Threads own disjoint runs of cells; each cell folds the impacts in order.
    #[default]
    CellMajor,
    /// Threads own fixed chunks of impacts, each summed into a private
    /// accumulator; accumulators are merged into the layer in chunk order.
    ImpactMajor,
}

/// Parameters shared by every cell of one worker.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DepositParams {
    pub normalizer: usize,
    pub threshold: f32,
    pub strategy: Deposition,
}

/// Add the attenuated energy of every impact in `storm` to the owned cells.
pub fn deposit_storm(layer: &mut LocalLayer, storm: &Storm, params: &DepositParams) {
    if storm.is_empty() || layer.is_empty() {
        return;
    }
    match params.strategy {
        Deposition::CellMajor => deposit_cell_major(layer, storm, params),
        Deposition::ImpactMajor => deposit_impact_major(layer, storm, params),
    }
}

fn deposit_cell_major(layer: &mut LocalLayer, storm: &Storm, params: &DepositParams) {
    let start = layer.bounds().start;
    let impacts = storm.impacts();
    layer
        .interior_mut()
        .par_iter_mut()
        .with_min_len(PAR_MIN_LEN / impacts.len().max(1) + 1)
        .enumerate()
        .for_each(|(offset, cell)| {
            let k = start + offset;
            *cell = impacts.iter().fold(*cell, |acc, imp| {
                acc + update_control_point(k, imp.position, imp.energy(), params.normalizer, params.threshold)
            });
        });
}

fn deposit_impact_major(layer: &mut LocalLayer, storm: &Storm, params: &DepositParams) {
    let start = layer.bounds().start;
    let n = layer.len();
    // A batch keeps at most one accumulator per thread alive. Batch and chunk
    // boundaries are both multiples of IMPACT_CHUNK, so the merge order never
    // depends on the pool size.
    let batch = IMPACT_CHUNK * rayon::current_num_threads().max(1);
    for impacts in storm.impacts().chunks(batch) {
        let partials: Vec<Vec<f32>> = impacts
            .par_chunks(IMPACT_CHUNK)
            .map(|chunk| {
                let mut acc = vec![0.0f32; n];
                for imp in chunk {
                    let energy = imp.energy();
                    for (offset, a) in acc.iter_mut().enumerate() {
                        let e = update_control_point(start + offset, imp.position, energy, params.normalizer, params.threshold);
                        if e != 0.0 {
                            *a += e;
                        }
                    }
                }
                acc
            })
            .collect();
        let cells = layer.interior_mut();
        for acc in &partials {
            cells
                .par_iter_mut()
                .with_min_len(PAR_MIN_LEN)
                .zip(acc.par_iter())
                .for_each(|(c, a)| *c += a);
        }
    }
}
