//! Cross-worker reduction of per-partition maxima.
//!
//! Every worker contributes one [`WireMaximum`] slot; the all-gathered slots
//! are folded in rank order with [`merge_maxima`], so every rank ends
//! up with the same answer.

use bytemuck::Zeroable;

use crate::algs::communicator::Communicator;
use crate::algs::wire::{WireMaximum, cast_slice, cast_slice_mut};
use crate::physics::relax::{LocalMaximum, merge_maxima};
use crate::storm_error::StormError;

/// Combine the per-worker candidates into the global maximum of the layer.
pub fn global_maximum<C>(local: Option<LocalMaximum>, comm: &C) -> Result<Option<LocalMaximum>, StormError>
where
    C: Communicator + ?Sized,
{
    let send = [WireMaximum::encode(local)];
    let mut recv = vec![WireMaximum::zeroed(); comm.size()];
    comm.allgather(cast_slice(&send), cast_slice_mut(&mut recv))?;
    Ok(recv.iter().map(WireMaximum::decode).fold(None, merge_maxima))
}
