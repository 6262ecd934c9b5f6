use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, WordMemoError};

/// Highest level a card can reach. Grading `knew` at this level keeps it here.
pub const MAX_LEVEL: u8 = 5;

/// Review gap in days for levels 1 through 5.
pub const DEFAULT_INTERVALS: [u32; MAX_LEVEL as usize] = [1, 3, 7, 14, 30];

/// Gap before a missed card (level 0) comes due again.
pub const DEFAULT_RELEARN_MINUTES: u32 = 10;

/// Leitner-style interval table: level 0 relearns after a few minutes,
/// each higher level waits a fixed number of days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scheduler {
    relearn_minutes: u32,
    intervals: [u32; MAX_LEVEL as usize],
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            relearn_minutes: DEFAULT_RELEARN_MINUTES,
            intervals: DEFAULT_INTERVALS,
        }
    }
}

impl Scheduler {
    /// Builds a scheduler from day counts for levels 1..=5. An empty slice
    /// selects [`DEFAULT_INTERVALS`].
    pub fn new(intervals: &[u32]) -> Result<Self> {
        if intervals.is_empty() {
            return Ok(Self::default());
        }
        let intervals: [u32; MAX_LEVEL as usize] = intervals
            .try_into()
            .map_err(|_| WordMemoError::InvalidParameters)?;
        if intervals[0] == 0 || intervals.windows(2).any(|w| w[0] >= w[1]) {
            return Err(WordMemoError::InvalidParameters);
        }
        Ok(Self {
            relearn_minutes: DEFAULT_RELEARN_MINUTES,
            intervals,
        })
    }

    pub fn with_relearn(mut self, minutes: u32) -> Result<Self> {
        if minutes == 0 {
            return Err(WordMemoError::InvalidParameters);
        }
        self.relearn_minutes = minutes;
        Ok(self)
    }

    pub fn interval(&self, level: u8) -> Duration {
        match level.min(MAX_LEVEL) {
            0 => Duration::minutes(self.relearn_minutes as i64),
            l => Duration::days(self.intervals[l as usize - 1] as i64),
        }
    }

    /// When a card at `level` should next be shown, measured from `now`.
    pub fn next_due(&self, level: u8, now: DateTime<Utc>) -> DateTime<Utc> {
        now + self.interval(level)
    }
}

/// Level after a grade: one step up on `knew` (capped), back to 0 on `forgot`.
pub fn next_level(level: u8, knew: bool) -> u8 {
    if knew {
        level.saturating_add(1).min(MAX_LEVEL)
    } else {
        0
    }
}
