//! Input and output around the simulation core: storm description files
//! and the run report.

pub mod report;
pub mod storm_file;

pub use report::RunReport;
pub use storm_file::{parse_storm, read_storm_file};
