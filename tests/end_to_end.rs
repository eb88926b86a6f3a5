mod util;
use util::*;

use energy_storms::data::ENERGY_SCALE;
use energy_storms::physics::{DepositParams, THRESHOLD, deposit_storm, update_control_point};
use energy_storms::prelude::*;
use std::time::Duration;

#[test]
fn single_impact_peaks_at_its_cell_for_any_worker_count() {
    let storms = vec![Storm::from_pairs(&[(5, 1000.0)])];
    for workers in [1, 2, 5] {
        let results = simulate_in_process(&EngineConfig::new(10), &storms, workers).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].position, 5, "{workers} workers");
        assert!(results[0].value > 0.0);
    }
}

#[test]
fn partition_normalization_keeps_the_peak_position() {
    let storms = vec![Storm::from_pairs(&[(5, 1000.0)])];
    for workers in [1, 2, 5] {
        let cfg = EngineConfig {
            normalization: Normalization::Partition,
            ..EngineConfig::new(10)
        };
        let results = simulate_in_process(&cfg, &storms, workers).unwrap();
        assert_eq!(results[0].position, 5, "{workers} workers");
    }
}

#[test]
fn partition_normalization_divides_by_each_workers_share() {
    // 10 cells over 3 workers: partitions of 4, 3 and 3 cells
    let energy = 1.0 * ENERGY_SCALE;
    for rank in 0..3 {
        let bounds = partition_for(10, 3, rank).unwrap();
        let mut layer = LocalLayer::new(bounds).unwrap();
        let params = DepositParams {
            normalizer: Normalization::Partition.normalizer(&bounds, 10),
            threshold: THRESHOLD,
            strategy: Deposition::CellMajor,
        };
        deposit_storm(&mut layer, &Storm::from_pairs(&[(5, 1.0)]), &params);
        let local_size = bounds.size as f32;
        for (i, &v) in layer.interior().iter().enumerate() {
            let k = bounds.start + i;
            let want = energy / local_size / ((k.abs_diff(5) + 1) as f32).sqrt();
            assert_eq!(v, want, "rank {rank} cell {k}");
        }
    }

    // the peak cell and both neighbours sit on the 3-cell middle partition
    let cfg = EngineConfig {
        normalization: Normalization::Partition,
        ..EngineConfig::new(10)
    };
    let results = simulate_in_process(&cfg, &[Storm::from_pairs(&[(5, 1.0)])], 3).unwrap();
    let c = |k: usize| update_control_point(k, 5, energy, 3, THRESHOLD);
    let want = StormResult {
        position: 5,
        value: (c(4) + c(5) + c(6)) / 3.0,
    };
    assert_eq!(results[0], want);
    let layer_normalized = simulate_in_process(&EngineConfig::new(10), &[Storm::from_pairs(&[(5, 1.0)])], 3).unwrap();
    assert!(layer_normalized[0].value < want.value);
}

#[test]
fn single_worker_matches_hand_computed_values() {
    // layer of 5, one impact of energy 1000 at cell 2, normalized by 5
    let storms = vec![Storm::from_pairs(&[(2, 1.0)])];
    let results = simulate_in_process(&EngineConfig::new(5), &storms, 1).unwrap();

    let dep: Vec<f32> = (0..5usize)
        .map(|k| 1000.0 / 5.0 / ((k.abs_diff(2) + 1) as f32).sqrt())
        .collect();
    let relaxed_2 = (dep[1] + dep[2] + dep[3]) / 3.0;
    assert_eq!(results[0], StormResult { position: 2, value: relaxed_2 });
}

#[test]
fn two_peaks_report_the_higher_one_across_partitions() {
    let storms = vec![Storm::from_pairs(&[(3, 1.0), (15, 2.0)])];
    for workers in [1, 2, 3, 4] {
        let results = simulate_in_process(&EngineConfig::new(20), &storms, workers).unwrap();
        assert_eq!(results[0].position, 15, "{workers} workers");
    }
}

#[test]
fn storms_accumulate_in_order() {
    let storms = vec![
        Storm::from_pairs(&[(4, 1.0)]),
        Storm::from_pairs(&[(16, 5.0)]),
        Storm::default(),
    ];
    let results = simulate_in_process(&EngineConfig::new(20), &storms, 3).unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].position, 4);
    assert_eq!(results[1].position, 16);
    // an empty storm only relaxes the layer further
    assert_eq!(results[2].position, 16);
    assert!(results[2].value < results[1].value);
}

#[test]
fn invalid_impact_fails_every_worker_without_results() {
    let storms = vec![Storm::from_pairs(&[(2, 1.0)]), Storm::from_pairs(&[(30, 1.0)])];
    assert_eq!(
        simulate_in_process(&EngineConfig::new(20), &storms, 4),
        Err(StormError::ImpactOutOfBounds {
            storm: 1,
            position: 30,
            layer_size: 20
        })
    );
}

#[test]
fn storm_files_drive_a_full_run() {
    let dir = std::env::temp_dir().join(format!("energy-storms-e2e-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let a = dir.join("storm_a.txt");
    let b = dir.join("storm_b.txt");
    std::fs::write(&a, "2\n3 4\n10 1\n").unwrap();
    std::fs::write(&b, "1\n25 9\n").unwrap();

    let storms = vec![read_storm_file(&a).unwrap(), read_storm_file(&b).unwrap()];
    let results = simulate_in_process(&EngineConfig::new(30), &storms, 2).unwrap();
    assert_eq!(results[0].position, 3);
    assert_eq!(results[1].position, 25);

    let report = RunReport::new(Duration::from_secs(1), results);
    assert!(report.to_string().starts_with("Time: 1.000000\nResult: 3 "));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn random_storms_keep_the_layer_finite() {
    let storms = random_storms(200, 6, 40, 7);
    let mut engine = StormEngine::new(EngineConfig::new(200), NoComm).unwrap();
    let results = engine.run(&storms).unwrap();
    assert_eq!(results.len(), 6);
    engine.layer().validate_invariants().unwrap();
    for r in &results {
        assert!(r.position < 200);
        assert!(r.value >= 0.0);
    }
}

#[cfg(any(debug_assertions, feature = "check-invariants"))]
#[test]
fn panicking_worker_ends_the_whole_run() {
    // worker 0's cells overflow to infinity and fail the layer invariants,
    // while worker 1 stays finite and moves on to the second storm
    let storms = vec![
        Storm::from_pairs(&vec![(0, 3.0e35); 167]),
        Storm::from_pairs(&[(60, 1.0)]),
    ];
    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let _ = tx.send(simulate_in_process(&EngineConfig::new(100), &storms, 2));
    });
    let outcome = rx
        .recv_timeout(Duration::from_secs(60))
        .expect("peers of a panicked worker must be released");
    assert_eq!(outcome, Err(StormError::WorkerPanicked(0)));
}
