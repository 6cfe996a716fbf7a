use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ConfigError;

/// Gradual daily ramp-up plus in-day batch/rest pacing for a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RampConfig {
    #[serde(default = "default_initial_daily_quota")]
    pub initial_daily_quota: u64,
    #[serde(default = "default_daily_increase")]
    pub daily_increase: u64,
    #[serde(default = "default_max_daily_quota")]
    pub max_daily_quota: u64,
    /// Messages sent back-to-back before a rest.
    #[serde(default = "default_rest_after_count")]
    pub rest_after_count: u64,
    /// Length of each rest; zero disables resting.
    #[serde(default = "default_rest_duration_minutes")]
    pub rest_duration_minutes: u64,
}

fn default_initial_daily_quota() -> u64 { 50 }
fn default_daily_increase() -> u64 { 10 }
fn default_max_daily_quota() -> u64 { 200 }
fn default_rest_after_count() -> u64 { 20 }
fn default_rest_duration_minutes() -> u64 { 5 }

impl Default for RampConfig {
    fn default() -> Self {
        Self {
            initial_daily_quota: default_initial_daily_quota(),
            daily_increase: default_daily_increase(),
            max_daily_quota: default_max_daily_quota(),
            rest_after_count: default_rest_after_count(),
            rest_duration_minutes: default_rest_duration_minutes(),
        }
    }
}

impl RampConfig {
    pub fn rest_enabled(&self) -> bool {
        self.rest_duration_minutes > 0
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_daily_quota == 0 {
            return Err(ConfigError::ZeroInitialQuota);
        }
        if self.max_daily_quota < self.initial_daily_quota {
            return Err(ConfigError::MaxBelowInitial {
                initial: self.initial_daily_quota,
                max: self.max_daily_quota,
            });
        }
        if self.rest_enabled() && self.rest_after_count == 0 {
            return Err(ConfigError::ZeroRestAfterCount {
                rest_duration_minutes: self.rest_duration_minutes,
            });
        }
        Ok(())
    }

    /// Quota for day `day_index` before clipping to the remaining audience.
    pub fn quota_for_day(&self, day_index: u64) -> u64 {
        self.initial_daily_quota
            .saturating_add(self.daily_increase.saturating_mul(day_index))
            .min(self.max_daily_quota)
    }
}

/// What the renderer emits for a `{{name}}` with no binding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingVariablePolicy {
    /// Emit nothing.
    #[default]
    Empty,
    /// Emit the placeholder itself, e.g. `{{nome}}`.
    Keep,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Scheduled,
    Active,
    Paused,
    Completed,
}

/// A broadcast campaign as authored in the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: Uuid,
    pub title: String,
    pub template: String,
    /// Distinct recipients.
    pub audience: u64,
    /// `None` means "send now".
    pub scheduled_start: Option<NaiveDateTime>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
}

impl Campaign {
    pub fn new(title: impl Into<String>, template: impl Into<String>, audience: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            template: template.into(),
            audience,
            scheduled_start: None,
            tags: Vec::new(),
            priority: Priority::default(),
            created_at: Utc::now(),
        }
    }

    pub fn scheduled_at(mut self, start: NaiveDateTime) -> Self {
        self.scheduled_start = Some(start);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
        self
    }

    /// Status a freshly created campaign starts in.
    pub fn initial_status(&self) -> CampaignStatus {
        if self.scheduled_start.is_some() {
            CampaignStatus::Scheduled
        } else {
            CampaignStatus::Active
        }
    }
}

/// One step of a drip ("funnel") campaign.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunnelMessage {
    pub template: String,
    /// Days to wait after the previous step; ignored for the first step.
    pub delay_days: u32,
}
