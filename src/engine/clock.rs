// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::record::{TimeMode, Timestamp};
use chrono::{DateTime, Duration, Utc};

/// Event clock of one run.
///
/// Ordinal time starts at 1 and ticks once per event. Wall-clock readings that do not
/// advance past the previous one are bumped by a microsecond so stamps stay strictly
/// increasing.
#[derive(Debug)]
pub struct Clock {
    mode: TimeMode,
    ordinal: u64,
    last: Option<DateTime<Utc>>,
}

impl Clock {
    pub fn new(mode: TimeMode) -> Self {
        Self {
            mode,
            ordinal: 0,
            last: None,
        }
    }

    pub fn mode(&self) -> TimeMode {
        self.mode
    }

    pub fn tick(&mut self) -> Timestamp {
        match self.mode {
            TimeMode::OrdinalTime => {
                self.ordinal += 1;
                Timestamp::Ordinal(self.ordinal)
            }
            TimeMode::WallClock => {
                let mut now = Utc::now();
                if let Some(last) = self.last {
                    if now <= last {
                        now = last + Duration::microseconds(1);
                    }
                }
                self.last = Some(now);
                Timestamp::WallClock(now)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticks_are_strictly_increasing() {
        for mode in [TimeMode::OrdinalTime, TimeMode::WallClock] {
            let mut clock = Clock::new(mode);
            let stamps: Vec<Timestamp> = (0..100).map(|_| clock.tick()).collect();
            assert!(stamps.windows(2).all(|pair| pair[0] < pair[1]), "{}", mode);
        }
    }

    #[test]
    fn test_ordinal_time_starts_at_one() {
        let mut clock = Clock::new(TimeMode::OrdinalTime);
        assert_eq!(clock.tick(), Timestamp::Ordinal(1));
        assert_eq!(clock.tick(), Timestamp::Ordinal(2));
        assert_eq!(clock.mode(), TimeMode::OrdinalTime);
    }
}
