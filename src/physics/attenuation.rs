//! Distance-based attenuation of one impact on one cell.

use serde::{Deserialize, Serialize};

use crate::partitioning::PartitionBounds;

/// Default noise floor, scaled by the normalizing size before comparison.
pub const THRESHOLD: f32 = 0.001;

/// Which size divides every contribution (and the noise floor).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Normalization {
    /// Global layer size: cell values do not depend on the worker count.
    #[default]
    Layer,
    /// The worker's own partition size, as the distributed benchmark does.
    Partition,
}

impl Normalization {
    /// The divisor a worker owning `bounds` uses on a layer of `layer_size` cells.
    pub fn normalizer(self, bounds: &PartitionBounds, layer_size: usize) -> usize {
        match self {
            Normalization::Layer => layer_size,
            Normalization::Partition => bounds.size,
        }
    }
}

/// Energy that an impact of `energy` at `pos` adds to cell `k`.
///
/// The impact cell itself is at distance 1, so the contribution is finite
/// everywhere. Real attenuation grows with the square of the distance; the
/// square root used here spreads every impact over a much wider range of
/// cells. Contributions whose magnitude falls below `threshold / normalizer`
/// are dropped and the function returns exactly `0.0`.
#[inline]
pub fn update_control_point(k: usize, pos: usize, energy: f32, normalizer: usize, threshold: f32) -> f32 {
    let distance = pos.abs_diff(k) + 1;
    let attenuation = (distance as f32).sqrt();
    let size = normalizer as f32;
    let energy_k = energy / size / attenuation;
    if energy_k.abs() >= threshold / size {
        energy_k
    } else {
        0.0
    }
}
