//! Communication algorithms: transport, wire records, halo exchange and reductions.

pub mod communicator;
pub mod halo;
pub mod reduction;
pub mod wire;

pub use halo::exchange_ghosts;
pub use reduction::global_maximum;
