#![allow(dead_code)]
use energy_storms::prelude::*;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Reproducible storms with impacts anywhere on the layer and mixed-sign values.
pub fn random_storms(layer_size: usize, n_storms: usize, impacts: usize, seed: u64) -> Vec<Storm> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..n_storms)
        .map(|_| {
            (0..impacts)
                .map(|_| Impact::new(rng.gen_range(0..layer_size), rng.gen_range(-2.0f32..10.0)))
                .collect()
        })
        .collect()
}

/// Run `f` once per rank of an in-process world, each on its own thread.
/// Results come back in rank order.
pub fn run_ranks<T, F>(workers: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(RayonComm) -> T + Sync,
{
    std::thread::scope(|s| {
        let handles: Vec<_> = RayonComm::world(workers)
            .into_iter()
            .map(|comm| {
                let f = &f;
                s.spawn(move || f(comm))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
}

/// Layer whose owned cells hold `base + global index`.
pub fn ramp_layer(bounds: PartitionBounds, base: f32) -> LocalLayer {
    let mut layer = LocalLayer::new(bounds).unwrap();
    let start = bounds.start;
    for (i, v) in layer.interior_mut().iter_mut().enumerate() {
        *v = base + (start + i) as f32;
    }
    layer
}
