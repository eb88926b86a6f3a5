//! Layer physics: attenuation, deposition and relaxation.

pub mod attenuation;
pub mod deposit;
pub mod relax;

pub use attenuation::{Normalization, THRESHOLD, update_control_point};
pub use deposit::{DepositParams, Deposition, deposit_storm};
pub use relax::{LocalMaximum, find_local_maximum, merge_maxima, relax};
