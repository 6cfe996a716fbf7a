//! Funnel (drip) campaigns — a short sequence of messages spaced by whole days.

use campaign_core::{CampaignResult, ConfigError, FunnelMessage};
use campaign_spintext::{parse, Template};
use chrono::{Duration, NaiveDateTime};
use tracing::info;

pub const MAX_FUNNEL_MESSAGES: usize = 4;

#[derive(Debug, Clone)]
pub struct FunnelStep {
    /// 1-based position in the funnel.
    pub order: usize,
    pub template: Template,
    /// Days after the recipient enters the funnel.
    pub offset_days: u64,
}

/// A validated funnel: every template parsed, delays accumulated.
#[derive(Debug, Clone)]
pub struct FunnelSchedule {
    steps: Vec<FunnelStep>,
    end: Option<NaiveDateTime>,
}

impl FunnelSchedule {
    /// The first message is sent on entry; each later one waits `delay_days >= 1`
    /// after its predecessor. Steps due after `end` are never sent.
    pub fn new(messages: &[FunnelMessage], end: Option<NaiveDateTime>) -> CampaignResult<Self> {
        if messages.is_empty() || messages.len() > MAX_FUNNEL_MESSAGES {
            return Err(ConfigError::FunnelLength {
                got: messages.len(),
                max: MAX_FUNNEL_MESSAGES,
            }
            .into());
        }

        let mut steps = Vec::with_capacity(messages.len());
        let mut offset_days = 0u64;
        for (index, message) in messages.iter().enumerate() {
            if index > 0 {
                if message.delay_days == 0 {
                    return Err(ConfigError::FunnelDelay { index: index + 1 }.into());
                }
                offset_days += u64::from(message.delay_days);
            }
            steps.push(FunnelStep {
                order: index + 1,
                template: parse(&message.template)?,
                offset_days,
            });
        }

        info!(steps = steps.len(), span_days = offset_days, "funnel validated");
        Ok(Self { steps, end })
    }

    pub fn steps(&self) -> &[FunnelStep] {
        &self.steps
    }

    /// Days between the first and last message.
    pub fn span_days(&self) -> u64 {
        self.steps.last().map(|s| s.offset_days).unwrap_or(0)
    }

    /// Send time of each step for a recipient entering at `entry`, skipping
    /// steps that would land after the funnel's end.
    pub fn step_times(&self, entry: NaiveDateTime) -> Vec<(&FunnelStep, NaiveDateTime)> {
        self.steps
            .iter()
            .filter_map(|step| {
                let days = i64::try_from(step.offset_days).ok()?;
                let at = entry.checked_add_signed(Duration::days(days))?;
                match self.end {
                    Some(end) if at > end => None,
                    _ => Some((step, at)),
                }
            })
            .collect()
    }
}
