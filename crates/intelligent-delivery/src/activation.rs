//! Campaign activation — validates the template and freezes the dispatch plan.

use std::collections::HashMap;

use campaign_core::{Campaign, CampaignResult, CampaignStatus, MissingVariablePolicy, RampConfig};
use campaign_spintext::{parse, render_with, Chooser, Rendered, Template};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tracing::info;

use crate::pacing::{send_timestamps, SendTimestamps};
use crate::ramp::{plan, DispatchPlan};

/// A campaign whose template parsed and whose plan is fixed.
/// Re-activating builds a new value; this one is never mutated.
#[derive(Debug, Clone)]
pub struct ActivatedCampaign {
    campaign: Campaign,
    template: Template,
    ramp: RampConfig,
    plan: DispatchPlan,
    status: CampaignStatus,
    starts_at: NaiveDateTime,
}

/// Parse the campaign template and compute its plan. Nothing is queued when
/// either step fails.
pub fn activate(campaign: Campaign, ramp: &RampConfig, now: NaiveDateTime) -> CampaignResult<ActivatedCampaign> {
    let template = parse(&campaign.template)?;
    let starts_at = campaign.scheduled_start.unwrap_or(now);
    let plan = plan(campaign.audience, ramp, starts_at.date())?;
    let status = campaign.initial_status();

    info!(
        campaign_id = %campaign.id,
        title = %campaign.title,
        audience = campaign.audience,
        days = plan.len(),
        variations = template.variation_count(),
        status = ?status,
        "campaign activated"
    );

    Ok(ActivatedCampaign {
        campaign,
        template,
        ramp: *ramp,
        plan,
        status,
        starts_at,
    })
}

impl ActivatedCampaign {
    pub fn campaign(&self) -> &Campaign {
        &self.campaign
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn plan(&self) -> &DispatchPlan {
        &self.plan
    }

    pub fn ramp(&self) -> &RampConfig {
        &self.ramp
    }

    pub fn status(&self) -> CampaignStatus {
        self.status
    }

    /// Recompute with a new ramp, e.g. after the campaign was edited.
    pub fn reactivate(self, ramp: &RampConfig, now: NaiveDateTime) -> CampaignResult<Self> {
        activate(self.campaign, ramp, now)
    }

    /// Send instants for `date`. The first day opens at the campaign start;
    /// later days open at `day_start`.
    pub fn day_timestamps(&self, date: NaiveDate, day_start: NaiveTime) -> Option<SendTimestamps> {
        let day = self.plan.day(date)?;
        let opens_at = if day.day_index == 0 {
            self.starts_at
        } else {
            date.and_time(day_start)
        };
        Some(send_timestamps(opens_at, day.quota, &self.ramp))
    }

    /// Message for one recipient.
    pub fn render_for(
        &self,
        variables: &HashMap<String, String>,
        missing: MissingVariablePolicy,
        chooser: &mut dyn Chooser,
    ) -> Rendered {
        render_with(&self.template, variables, missing, chooser)
    }
}
