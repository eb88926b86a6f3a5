//! Reader for storm description files.
//!
//! A storm file is a whitespace-separated list of numbers: the number of
//! impacts `n`, followed by `n` pairs `position value`.
//!
//! ```text
//! 3
//! 12 40
//! 35 -8
//! 12 5
//! ```

use std::path::Path;

use crate::data::storm::{Impact, Storm};
use crate::storm_error::StormError;

fn malformed(msg: impl Into<String>) -> StormError {
    StormError::MalformedStorm(msg.into())
}

/// Parse a storm description held in memory.
pub fn parse_storm(text: &str) -> Result<Storm, StormError> {
    let mut tokens = text.split_whitespace();
    let count: usize = tokens
        .next()
        .ok_or_else(|| malformed("missing impact count"))?
        .parse()
        .map_err(|e| malformed(format!("impact count: {e}")))?;

    let mut impacts = Vec::with_capacity(count.min(1 << 20));
    for i in 0..count {
        let (Some(pos), Some(val)) = (tokens.next(), tokens.next()) else {
            return Err(malformed(format!("expected {count} impacts, found {i}")));
        };
        let position = pos
            .parse::<usize>()
            .map_err(|e| malformed(format!("impact {i} position `{pos}`: {e}")))?;
        let value = val
            .parse::<f32>()
            .map_err(|e| malformed(format!("impact {i} value `{val}`: {e}")))?;
        if !value.is_finite() {
            return Err(malformed(format!("impact {i} value `{val}` is not finite")));
        }
        impacts.push(Impact::new(position, value));
    }
    if let Some(extra) = tokens.next() {
        return Err(malformed(format!("unexpected trailing token `{extra}` after {count} impacts")));
    }
    Ok(Storm::new(impacts))
}

/// Read a storm description file.
pub fn read_storm_file(path: impl AsRef<Path>) -> Result<Storm, StormError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| StormError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let storm = parse_storm(&text)?;
    log::debug!("{}: {} impacts", path.display(), storm.len());
    Ok(storm)
}
