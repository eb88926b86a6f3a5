//! Relaxation between storms and the search for the local energy maximum.
//!
//! Relaxation replaces every owned cell by the mean of itself and its two
//! neighbours, reading from a snapshot so the pass never sees its own
//! writes. The first and last cells of the *global* layer have no outer
//! neighbour and keep their value; partition edges use the ghost cells.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::data::layer::{LocalLayer, PAR_MIN_LEN};

/// A cell whose value strictly exceeds both neighbours.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocalMaximum {
    /// Global cell index.
    pub position: usize,
    pub value: f32,
}

impl LocalMaximum {
    /// The better of two candidates: higher value, then lower position.
    ///
    /// This is a total order on candidates, so folding with it gives the same
    /// answer whatever the grouping or order of the inputs.
    pub fn prefer(self, other: LocalMaximum) -> LocalMaximum {
        if other.value > self.value || (other.value == self.value && other.position < self.position) {
            other
        } else {
            self
        }
    }
}

/// Fold two optional candidates with [`LocalMaximum::prefer`].
pub fn merge_maxima(a: Option<LocalMaximum>, b: Option<LocalMaximum>) -> Option<LocalMaximum> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.prefer(b)),
        (a, b) => a.or(b),
    }
}

/// Whether buffer index `k` has a real neighbour on both sides.
#[inline]
fn is_inner(layer: &LocalLayer, k: usize) -> bool {
    let b = layer.bounds();
    !(k == 1 && !b.has_left_neighbor) && !(k == b.size && !b.has_right_neighbor)
}

/// Smooth the owned cells with a 3-point average.
///
/// Ghost values must be fresh for the current storm.
pub fn relax(layer: &mut LocalLayer) {
    let n = layer.len();
    if n == 0 {
        return;
    }
    let b = *layer.bounds();
    let (cells, scratch) = layer.cells_and_scratch_mut();
    scratch.copy_from_slice(cells);
    let scratch = &*scratch;
    cells[1..=n]
        .par_iter_mut()
        .with_min_len(PAR_MIN_LEN)
        .enumerate()
        .for_each(|(i, cell)| {
            let k = i + 1;
            if (k == 1 && !b.has_left_neighbor) || (k == n && !b.has_right_neighbor) {
                return;
            }
            *cell = (scratch[k - 1] + scratch[k] + scratch[k + 1]) / 3.0;
        });
}

/// Best local maximum among the owned cells, if any.
///
/// Neighbours at the partition edges are the ghost cells, which must hold
/// the neighbours' relaxed values. The global first and last cells are never
/// candidates. A candidate must also be strictly positive: the search starts
/// from a zero floor, so a storm that leaves only non-positive peaks yields
/// `None`.
pub fn find_local_maximum(layer: &LocalLayer) -> Option<LocalMaximum> {
    let n = layer.len();
    let cells = layer.cells();
    (1..n + 1)
        .into_par_iter()
        .with_min_len(PAR_MIN_LEN)
        .filter(|&k| is_inner(layer, k))
        .filter_map(|k| {
            let v = cells[k];
            (v > 0.0 && v > cells[k - 1] && v > cells[k + 1]).then(|| LocalMaximum {
                position: layer.global_position(k),
                value: v,
            })
        })
        .reduce_with(LocalMaximum::prefer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partitioning::partition_for;

    fn layer_with(layer_size: usize, workers: usize, rank: usize, values: &[f32]) -> LocalLayer {
        let mut layer = LocalLayer::new(partition_for(layer_size, workers, rank).unwrap()).unwrap();
        layer.interior_mut().copy_from_slice(values);
        layer
    }

    #[test]
    fn uniform_layer_is_a_fixed_point() {
        let mut layer = layer_with(6, 1, 0, &[3.0; 6]);
        relax(&mut layer);
        assert!(layer.interior().iter().all(|&v| v == 3.0));
    }

    #[test]
    fn global_edges_are_left_unchanged() {
        let mut layer = layer_with(4, 1, 0, &[9.0, 0.0, 0.0, 9.0]);
        relax(&mut layer);
        assert_eq!(layer.interior(), &[9.0, 3.0, 3.0, 9.0]);
    }

    #[test]
    fn partition_edges_read_the_ghosts() {
        // middle rank of three: both edges have neighbours
        let mut layer = layer_with(9, 3, 1, &[0.0, 3.0, 0.0]);
        layer.set_left_ghost(6.0);
        layer.set_right_ghost(9.0);
        relax(&mut layer);
        assert_eq!(layer.interior(), &[3.0, 1.0, 4.0]);
        assert_eq!(layer.scratch(), &[6.0, 0.0, 3.0, 0.0, 9.0]);
    }

    #[test]
    fn maximum_prefers_highest_then_lowest_position() {
        let layer = layer_with(7, 1, 0, &[0.0, 5.0, 1.0, 5.0, 1.0, 2.0, 0.0]);
        assert_eq!(
            find_local_maximum(&layer),
            Some(LocalMaximum { position: 1, value: 5.0 })
        );
    }

    #[test]
    fn global_edges_and_plateaus_are_not_candidates() {
        let layer = layer_with(5, 1, 0, &[10.0, 2.0, 2.0, 1.0, 10.0]);
        assert_eq!(find_local_maximum(&layer), None);
    }

    #[test]
    fn non_positive_peaks_are_ignored() {
        let layer = layer_with(5, 1, 0, &[-5.0, -1.0, -3.0, -4.0, -5.0]);
        assert_eq!(find_local_maximum(&layer), None);
    }

    #[test]
    fn partition_edge_candidate_compares_with_ghost() {
        let mut layer = layer_with(6, 2, 1, &[4.0, 1.0, 0.0]);
        layer.set_left_ghost(3.0);
        assert_eq!(
            find_local_maximum(&layer),
            Some(LocalMaximum { position: 3, value: 4.0 })
        );
        layer.set_left_ghost(4.0);
        assert_eq!(find_local_maximum(&layer), None);
    }

    fn pool(threads: usize) -> rayon::ThreadPool {
        rayon::ThreadPoolBuilder::new().num_threads(threads).build().unwrap()
    }

    #[test]
    fn split_search_keeps_lowest_position_on_ties() {
        let n = 8 * PAR_MIN_LEN;
        let mut values = vec![0.0f32; n];
        // equal peaks in separate splits, a lower one in between
        for p in [n - 100, 6 * PAR_MIN_LEN, 3 * PAR_MIN_LEN + 7, PAR_MIN_LEN + 5] {
            values[p] = 2.0;
        }
        values[2 * PAR_MIN_LEN] = 1.0;
        let layer = layer_with(n, 1, 0, &values);
        for threads in [1, 2, 4, 8] {
            assert_eq!(
                pool(threads).install(|| find_local_maximum(&layer)),
                Some(LocalMaximum {
                    position: PAR_MIN_LEN + 5,
                    value: 2.0
                }),
                "{threads} threads"
            );
        }
    }

    #[test]
    fn split_relaxation_matches_one_thread() {
        let n = 6 * PAR_MIN_LEN + 3;
        let values: Vec<f32> = (0..n).map(|k| ((k * 7919) % 1013) as f32 * 0.37).collect();
        let relaxed_with = |threads: usize| {
            let mut layer = layer_with(n, 1, 0, &values);
            pool(threads).install(|| relax(&mut layer));
            layer.interior().to_vec()
        };
        assert_eq!(relaxed_with(1), relaxed_with(4));
    }

    #[test]
    fn merge_is_order_independent() {
        let a = Some(LocalMaximum { position: 4, value: 2.0 });
        let b = Some(LocalMaximum { position: 2, value: 2.0 });
        let c = Some(LocalMaximum { position: 9, value: 1.0 });
        assert_eq!(merge_maxima(a, b), merge_maxima(b, a));
        assert_eq!(merge_maxima(merge_maxima(a, c), b), b);
        assert_eq!(merge_maxima(None, c), c);
        assert_eq!(merge_maxima(None, None), None);
    }
}
