// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a run stamps its events. Fixed for the whole run.
///
/// # Variants
/// * `OrdinalTime` - a counter ticking once per event; records are reproducible
/// * `WallClock` - UTC time, strictly increasing within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeMode {
    OrdinalTime,
    #[default]
    WallClock,
}

impl TimeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeMode::OrdinalTime => "ordinal_time",
            TimeMode::WallClock => "wall_clock",
        }
    }

    pub fn is_ordinal(&self) -> bool {
        matches!(self, TimeMode::OrdinalTime)
    }
}

impl fmt::Display for TimeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Ordinal(u64),
    WallClock(DateTime<Utc>),
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timestamp::Ordinal(tick) => write!(f, "t{}", tick),
            Timestamp::WallClock(time) => write!(f, "{}", time.to_rfc3339()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_forms() {
        assert_eq!(serde_json::to_string(&Timestamp::Ordinal(7)).unwrap(), "7");
        assert_eq!(
            serde_json::to_string(&TimeMode::OrdinalTime).unwrap(),
            "\"ordinal_time\""
        );
        let mode: TimeMode = serde_yaml::from_str("wall_clock").unwrap();
        assert_eq!(mode, TimeMode::WallClock);
        assert_eq!(TimeMode::default(), TimeMode::WallClock);
    }
}
