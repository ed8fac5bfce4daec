use chrono::{DateTime, TimeDelta, Utc};

/// Default spacing between two ticks, in seconds.
pub const DEFAULT_INTERVAL_SECS: i64 = 60;

/// The shared timeline cursor.
///
/// Yields `start, start + interval, ...` for every tick strictly before `now`.
/// `now` is sampled once by the caller so the walk is bounded.
#[derive(Debug, Clone)]
pub struct Timeline {
    cursor: Option<DateTime<Utc>>,
    interval: TimeDelta,
    now: DateTime<Utc>,
}

impl Timeline {
    pub fn new(start: DateTime<Utc>, interval: TimeDelta, now: DateTime<Utc>) -> Self {
        Self {
            cursor: Some(start),
            interval,
            now,
        }
    }
}

impl Iterator for Timeline {
    type Item = DateTime<Utc>;

    fn next(&mut self) -> Option<Self::Item> {
        let tick = self.cursor.filter(|cursor| *cursor < self.now)?;

        // Stop instead of looping when the cursor would not move forward.
        self.cursor = tick
            .checked_add_signed(self.interval)
            .filter(|next| *next > tick);

        Some(tick)
    }
}
