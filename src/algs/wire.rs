//! Fixed, little-endian wire types for halo exchange and reductions.

use bytemuck::{Pod, Zeroable};
use static_assertions::const_assert_eq;
use std::mem::size_of;

use crate::physics::relax::LocalMaximum;

pub fn cast_slice<T: Pod>(v: &[T]) -> &[u8] {
    bytemuck::cast_slice(v)
}

pub fn cast_slice_mut<T: Pod>(v: &mut [T]) -> &mut [u8] {
    bytemuck::cast_slice_mut(v)
}

/// One layer cell on the wire.
///
/// All multi-byte values in these structs are **little-endian** on the wire.
/// We store them pre-LE with `.to_le()` and decode with `.from_le()`.
#[repr(transparent)]
#[derive(Copy, Clone, Pod, Zeroable, Debug, Default, PartialEq, Eq)]
pub struct WireCell {
    pub bits_le: u32,
}

impl WireCell {
    pub fn new(value: f32) -> Self {
        Self {
            bits_le: value.to_bits().to_le(),
        }
    }
    pub fn get(&self) -> f32 {
        f32::from_bits(u32::from_le(self.bits_le))
    }
}

/// A worker's best local maximum, or an empty slot when it has none.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable, Debug, Default, PartialEq, Eq)]
pub struct WireMaximum {
    pub position_le: u64,
    pub value_bits_le: u32,
    pub present_le: u32, // 0 = no candidate, 1 = candidate
}

const_assert_eq!(size_of::<WireCell>(), 4);
const_assert_eq!(size_of::<WireMaximum>(), 16);

impl WireMaximum {
    pub fn encode(max: Option<LocalMaximum>) -> Self {
        match max {
            Some(m) => Self {
                position_le: (m.position as u64).to_le(),
                value_bits_le: m.value.to_bits().to_le(),
                present_le: 1u32.to_le(),
            },
            None => Self::zeroed(),
        }
    }

    pub fn decode(&self) -> Option<LocalMaximum> {
        if u32::from_le(self.present_le) == 0 {
            return None;
        }
        Some(LocalMaximum {
            position: u64::from_le(self.position_le) as usize,
            value: f32::from_bits(u32::from_le(self.value_bits_le)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_preserves_bits() {
        for v in [0.0f32, -0.0, 1.5, -3.25e-7, f32::MAX] {
            assert_eq!(WireCell::new(v).get().to_bits(), v.to_bits());
        }
    }

    #[test]
    fn empty_maximum_is_all_zero() {
        let w = WireMaximum::encode(None);
        assert_eq!(cast_slice(&[w]), &[0u8; 16]);
        assert!(w.decode().is_none());
    }

    #[test]
    fn maximum_slot_carries_position_and_value() {
        let m = LocalMaximum {
            position: 7,
            value: 12.5,
        };
        assert_eq!(WireMaximum::encode(Some(m)).decode(), Some(m));
    }
}
