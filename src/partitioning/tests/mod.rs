use super::*;

#[test]
fn remainder_goes_to_lowest_ranks() {
    let parts = partition_all(10, 4).unwrap();
    let sizes: Vec<_> = parts.iter().map(|p| p.size).collect();
    let starts: Vec<_> = parts.iter().map(|p| p.start).collect();
    assert_eq!(sizes, vec![3, 3, 2, 2]);
    assert_eq!(starts, vec![0, 3, 6, 8]);
}

#[test]
fn single_worker_owns_everything_without_neighbours() {
    let p = partition_for(35, 1, 0).unwrap();
    assert_eq!((p.start, p.size), (0, 35));
    assert!(!p.has_left_neighbor && !p.has_right_neighbor);
    assert_eq!((p.left_rank(), p.right_rank()), (None, None));
}

#[test]
fn neighbour_flags_follow_rank_order() {
    let parts = partition_all(9, 3).unwrap();
    assert_eq!(parts[0].right_rank(), Some(1));
    assert_eq!(parts[0].left_rank(), None);
    assert_eq!(parts[1].left_rank(), Some(0));
    assert_eq!(parts[1].right_rank(), Some(2));
    assert_eq!(parts[2].right_rank(), None);
}

#[test]
fn more_workers_than_cells_leaves_empty_partitions() {
    let parts = partition_all(3, 5).unwrap();
    let sizes: Vec<_> = parts.iter().map(|p| p.size).collect();
    assert_eq!(sizes, vec![1, 1, 1, 0, 0]);
    assert_eq!(parts[4].start, 3);
}

#[test]
fn invalid_inputs_are_configuration_errors() {
    assert_eq!(partition_for(0, 2, 0), Err(StormError::InvalidLayerSize(0)));
    assert_eq!(partition_for(8, 0, 0), Err(StormError::InvalidWorkerCount(0)));
    assert_eq!(
        partition_for(8, 2, 2),
        Err(StormError::RankOutOfRange {
            rank: 2,
            workers: 2
        })
    );
    assert!(partition_all(8, 0).is_err());
}
