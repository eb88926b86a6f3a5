//! Storms and their particle impacts.

use serde::{Deserialize, Serialize};

use crate::storm_error::StormError;

/// Impact values are given in thousandths of the internal energy unit.
pub const ENERGY_SCALE: f32 = 1000.0;

/// A single particle hitting the layer.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Impact {
    /// Global cell hit by the particle.
    pub position: usize,
    /// Energy as read from the storm description.
    pub value: f32,
}

impl Impact {
    pub fn new(position: usize, value: f32) -> Self {
        Self { position, value }
    }

    /// Energy in internal units.
    #[inline]
    pub fn energy(&self) -> f32 {
        self.value * ENERGY_SCALE
    }
}

/// An ordered sequence of impacts applied to the layer in one simulation step.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Storm {
    impacts: Vec<Impact>,
}

impl Storm {
    pub fn new(impacts: Vec<Impact>) -> Self {
        Self { impacts }
    }

    /// Build a storm from `(position, value)` pairs.
    pub fn from_pairs(pairs: &[(usize, f32)]) -> Self {
        pairs.iter().map(|&(p, v)| Impact::new(p, v)).collect()
    }

    pub fn impacts(&self) -> &[Impact] {
        &self.impacts
    }

    pub fn len(&self) -> usize {
        self.impacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.impacts.is_empty()
    }

    /// Check every impact lands inside a layer of `layer_size` cells.
    /// `index` only labels the error.
    pub fn validate(&self, index: usize, layer_size: usize) -> Result<(), StormError> {
        match self.impacts.iter().find(|i| i.position >= layer_size) {
            Some(bad) => Err(StormError::ImpactOutOfBounds {
                storm: index,
                position: bad.position,
                layer_size,
            }),
            None => Ok(()),
        }
    }
}

impl FromIterator<Impact> for Storm {
    fn from_iter<I: IntoIterator<Item = Impact>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
