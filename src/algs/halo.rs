//! Ghost-cell exchange between rank neighbours.
//!
//! Each worker sends its first owned cell to the left neighbour's right
//! ghost and its last owned cell to the right neighbour's left ghost. A
//! missing neighbour skips that direction and the ghost is left untouched.

use crate::algs::communicator::{Communicator, HaloTags};
use crate::algs::wire::{WireCell, cast_slice, cast_slice_mut};
use crate::data::layer::LocalLayer;
use crate::storm_error::StormError;

/// Refresh both ghost cells of `layer` from its neighbours.
///
/// Collective over neighbours: every worker of the run must call it with the
/// same `tags` before any of them can proceed.
pub fn exchange_ghosts<C>(layer: &mut LocalLayer, comm: &C, tags: HaloTags) -> Result<(), StormError>
where
    C: Communicator + ?Sized,
{
    let bounds = *layer.bounds();
    if bounds.rank != comm.rank() {
        return Err(StormError::Comm(format!(
            "partition of rank {} exchanged through rank {}",
            bounds.rank,
            comm.rank()
        )));
    }
    let left = bounds.left_rank();
    let right = bounds.right_rank();

    // first owned cell travels left, right ghost arrives from the right
    let send = [WireCell::new(layer.first_cell())];
    let mut recv = [WireCell::default()];
    comm.sendrecv(cast_slice(&send), left, cast_slice_mut(&mut recv), right, tags.leftward)?;
    if right.is_some() {
        layer.set_right_ghost(recv[0].get());
    }

    // last owned cell travels right, left ghost arrives from the left
    let send = [WireCell::new(layer.last_cell())];
    let mut recv = [WireCell::default()];
    comm.sendrecv(cast_slice(&send), right, cast_slice_mut(&mut recv), left, tags.rightward)?;
    if left.is_some() {
        layer.set_left_ghost(recv[0].get());
    }

    log::trace!(
        "rank {}: ghosts [{}, {}]",
        bounds.rank,
        layer.left_ghost(),
        layer.right_ghost()
    );
    Ok(())
}
