//! Run report in the judge's output format.

use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::engine::StormResult;

/// Elapsed time and per-storm results of a whole run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunReport {
    pub elapsed: Duration,
    pub results: Vec<StormResult>,
}

impl RunReport {
    pub fn new(elapsed: Duration, results: Vec<StormResult>) -> Self {
        Self { elapsed, results }
    }
}

impl fmt::Display for RunReport {
    /// ```text
    /// Time: 0.001234
    /// Result: 5 93.870529 2 12.000000
    /// ```
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Time: {:.6}", self.elapsed.as_secs_f64())?;
        write!(f, "Result:")?;
        for r in &self.results {
            write!(f, " {} {:.6}", r.position, r.value)?;
        }
        Ok(())
    }
}
