//! Dispatch throttling — enforces a campaign-day's quota and batch/rest pacing
//! for concurrent senders.

use std::sync::Arc;

use campaign_core::RampConfig;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use dashmap::{DashMap, DashSet};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::ramp::DispatchPlan;

/// Outcome of asking to send one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Admission {
    /// Go ahead; `sequence` is the 0-based position within the day.
    Send { sequence: u64 },
    /// Batch finished; try again at `until`.
    Resting { until: NaiveDateTime },
    QuotaExhausted,
    /// The campaign has no dispatch day on this date.
    NotScheduled,
    Paused,
}

#[derive(Debug, Default)]
struct CursorState {
    sent: u64,
    in_batch: u64,
    resume_at: Option<NaiveDateTime>,
}

/// Ordered send cursor for one campaign-day. All senders go through the same lock.
#[derive(Debug)]
pub struct DispatchCursor {
    quota: u64,
    batch_size: Option<u64>,
    rest: Duration,
    state: Mutex<CursorState>,
}

impl DispatchCursor {
    pub fn new(quota: u64, ramp: &RampConfig) -> Self {
        let batch_size = (ramp.rest_enabled() && ramp.rest_after_count > 0).then_some(ramp.rest_after_count);
        let minutes = i64::try_from(ramp.rest_duration_minutes)
            .unwrap_or(i64::MAX)
            .min(i64::MAX / 60_000);
        Self {
            quota,
            batch_size,
            rest: Duration::minutes(minutes),
            state: Mutex::new(CursorState::default()),
        }
    }

    pub fn try_acquire(&self, now: NaiveDateTime) -> Admission {
        let mut state = self.state.lock();

        if state.sent >= self.quota {
            return Admission::QuotaExhausted;
        }
        if let Some(until) = state.resume_at {
            if now < until {
                return Admission::Resting { until };
            }
            state.resume_at = None;
            state.in_batch = 0;
        }

        let sequence = state.sent;
        state.sent += 1;
        state.in_batch += 1;

        if let Some(batch) = self.batch_size {
            if state.in_batch >= batch && state.sent < self.quota {
                let until = now.checked_add_signed(self.rest).unwrap_or(NaiveDateTime::MAX);
                debug!(sent = state.sent, until = %until, "batch complete, resting");
                state.resume_at = Some(until);
            }
        }

        Admission::Send { sequence }
    }

    pub fn sent(&self) -> u64 {
        self.state.lock().sent
    }

    pub fn remaining(&self) -> u64 {
        self.quota - self.sent()
    }

    pub fn quota(&self) -> u64 {
        self.quota
    }
}

/// Registry of campaign-day cursors built from activated dispatch plans.
///
/// Admissions follow plan order: a send is charged to the earliest plan day
/// that has opened and still has quota, so a day whose pacing runs past
/// midnight keeps its own budget.
pub struct DispatchThrottle {
    cursors: DashMap<(Uuid, NaiveDate), Arc<DispatchCursor>>,
    plan_days: DashMap<Uuid, Vec<NaiveDate>>,
    paused: DashSet<Uuid>,
}

impl DispatchThrottle {
    pub fn new() -> Self {
        Self {
            cursors: DashMap::new(),
            plan_days: DashMap::new(),
            paused: DashSet::new(),
        }
    }

    /// Install cursors for every day of `plan`, replacing any previous plan for
    /// the campaign. A paused campaign stays paused.
    pub fn register(&self, campaign_id: Uuid, plan: &DispatchPlan, ramp: &RampConfig) {
        self.remove_cursors(campaign_id);
        for day in &plan.days {
            self.cursors
                .insert((campaign_id, day.date), Arc::new(DispatchCursor::new(day.quota, ramp)));
        }
        self.plan_days
            .insert(campaign_id, plan.days.iter().map(|d| d.date).collect());
        info!(campaign_id = %campaign_id, days = plan.len(), "registered dispatch plan");
    }

    /// Forget the campaign entirely, including its pause flag.
    pub fn remove(&self, campaign_id: Uuid) {
        self.remove_cursors(campaign_id);
        self.paused.remove(&campaign_id);
    }

    fn remove_cursors(&self, campaign_id: Uuid) {
        self.cursors.retain(|(id, _), _| *id != campaign_id);
        self.plan_days.remove(&campaign_id);
    }

    pub fn cursor(&self, campaign_id: Uuid, date: NaiveDate) -> Option<Arc<DispatchCursor>> {
        self.cursors.get(&(campaign_id, date)).map(|c| Arc::clone(c.value()))
    }

    pub fn try_acquire(&self, campaign_id: Uuid, now: NaiveDateTime) -> Admission {
        if self.paused.contains(&campaign_id) {
            return Admission::Paused;
        }
        // Copy the dates out so no shard lock is held while waiting on a cursor.
        let days = match self.plan_days.get(&campaign_id) {
            Some(days) => days.value().clone(),
            None => return Admission::NotScheduled,
        };

        let mut opened = false;
        for date in days.into_iter().take_while(|d| *d <= now.date()) {
            opened = true;
            let Some(cursor) = self.cursor(campaign_id, date) else {
                continue;
            };
            match cursor.try_acquire(now) {
                Admission::QuotaExhausted => continue,
                admission => return admission,
            }
        }

        let finished = self
            .plan_days
            .get(&campaign_id)
            .map(|days| days.iter().all(|d| *d <= now.date()))
            .unwrap_or(true);
        if opened && finished {
            Admission::QuotaExhausted
        } else {
            Admission::NotScheduled
        }
    }

    pub fn pause(&self, campaign_id: Uuid) {
        self.paused.insert(campaign_id);
        info!(campaign_id = %campaign_id, "campaign paused");
    }

    pub fn resume(&self, campaign_id: Uuid) {
        self.paused.remove(&campaign_id);
        info!(campaign_id = %campaign_id, "campaign resumed");
    }

    pub fn is_paused(&self, campaign_id: Uuid) -> bool {
        self.paused.contains(&campaign_id)
    }

    pub fn sent_on(&self, campaign_id: Uuid, date: NaiveDate) -> u64 {
        self.cursor(campaign_id, date).map(|c| c.sent()).unwrap_or(0)
    }
}

impl Default for DispatchThrottle {
    fn default() -> Self {
        Self::new()
    }
}
