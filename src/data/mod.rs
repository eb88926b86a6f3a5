//! Data module: storms and the per-worker layer store

pub mod layer;
pub mod storm;

pub use layer::LocalLayer;
pub use storm::{ENERGY_SCALE, Impact, Storm};
