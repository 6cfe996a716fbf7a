//! In-day pacing — when each of a day's messages goes out, given batch/rest rules.

use campaign_core::RampConfig;
use chrono::{Duration, NaiveDateTime};

/// Lazily yields the send instant of every message of one dispatch day.
///
/// Message `i` goes out at
/// `day_start + i * message_interval + (i / rest_after_count) * rest_duration`.
#[derive(Debug, Clone)]
pub struct SendTimestamps {
    day_start: NaiveDateTime,
    quota: u64,
    next: u64,
    batch_size: Option<u64>,
    rest: Duration,
    message_interval: Duration,
}

/// Send instants for `quota` messages on a day opening at `day_start`.
pub fn send_timestamps(day_start: NaiveDateTime, quota: u64, ramp: &RampConfig) -> SendTimestamps {
    let batch_size = (ramp.rest_enabled() && ramp.rest_after_count > 0).then_some(ramp.rest_after_count);
    SendTimestamps {
        day_start,
        quota,
        next: 0,
        batch_size,
        rest: minutes(ramp.rest_duration_minutes),
        message_interval: Duration::zero(),
    }
}

fn minutes(m: u64) -> Duration {
    let m = i64::try_from(m).unwrap_or(i64::MAX).min(i64::MAX / 60_000);
    Duration::minutes(m)
}

impl SendTimestamps {
    pub fn with_message_interval(mut self, interval: Duration) -> Self {
        self.message_interval = interval;
        self
    }

    /// Number of rests taken during the day.
    pub fn rest_count(&self) -> u64 {
        match self.batch_size {
            Some(batch) if self.quota > 0 => (self.quota - 1) / batch,
            _ => 0,
        }
    }

    /// Instant of the last send, if any message is due.
    pub fn last_send(&self) -> Option<NaiveDateTime> {
        self.quota.checked_sub(1).and_then(|i| self.at(i))
    }

    fn at(&self, index: u64) -> Option<NaiveDateTime> {
        let sends = self.message_interval.checked_mul(i32::try_from(index).ok()?)?;
        let rests = match self.batch_size {
            Some(batch) => self.rest.checked_mul(i32::try_from(index / batch).ok()?)?,
            None => Duration::zero(),
        };
        self.day_start.checked_add_signed(sends)?.checked_add_signed(rests)
    }
}

impl Iterator for SendTimestamps {
    type Item = NaiveDateTime;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.quota {
            return None;
        }
        let at = self.at(self.next);
        self.next += 1;
        if at.is_none() {
            // Past the representable calendar: nothing after this can be scheduled.
            self.next = self.quota;
        }
        at
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.quota - self.next).unwrap_or(usize::MAX);
        (0, Some(remaining))
    }
}
