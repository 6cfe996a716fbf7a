//! Daily ramp-up planner — how many messages a campaign sends on each day.

use campaign_core::{ConfigError, RampConfig};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySchedule {
    pub day_index: u64,
    pub date: NaiveDate,
    pub quota: u64,
    /// Messages sent up to and including this day.
    pub cumulative: u64,
}

/// Day-by-day sending schedule. Immutable once computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchPlan {
    pub audience: u64,
    pub days: Vec<DaySchedule>,
}

impl DispatchPlan {
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn total(&self) -> u64 {
        self.days.iter().map(|d| d.quota).sum()
    }

    pub fn day(&self, date: NaiveDate) -> Option<&DaySchedule> {
        self.days.iter().find(|d| d.date == date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.days.last().map(|d| d.date)
    }
}

/// Compute the ramped schedule for `audience` recipients starting on `start`.
///
/// Day `k` sends `min(initial + increase * k, max)`; the last day is clipped so
/// the total equals the audience exactly.
pub fn plan(audience: u64, ramp: &RampConfig, start: NaiveDate) -> Result<DispatchPlan, ConfigError> {
    if let Err(e) = ramp.validate() {
        warn!(error = %e, "rejected ramp configuration");
        return Err(e);
    }

    let mut days = Vec::new();
    let mut cumulative = 0u64;
    let mut day_index = 0u64;

    while cumulative < audience {
        let quota = ramp.quota_for_day(day_index).min(audience - cumulative);
        let date = start
            .checked_add_days(Days::new(day_index))
            .ok_or_else(|| ConfigError::Invalid(format!("plan runs past the calendar on day {day_index}")))?;
        cumulative += quota;
        days.push(DaySchedule {
            day_index,
            date,
            quota,
            cumulative,
        });
        day_index += 1;
    }

    info!(
        audience,
        days = days.len(),
        start = %start,
        "computed dispatch plan"
    );

    Ok(DispatchPlan { audience, days })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 1).unwrap()
    }

    fn ramp(initial: u64, increase: u64, max: u64) -> RampConfig {
        RampConfig {
            initial_daily_quota: initial,
            daily_increase: increase,
            max_daily_quota: max,
            ..Default::default()
        }
    }

    #[test]
    fn test_last_day_is_clipped() {
        let plan = plan(100, &ramp(50, 10, 200), start()).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.days[0].quota, 50);
        assert_eq!(plan.days[0].cumulative, 50);
        assert_eq!(plan.days[1].quota, 50);
        assert_eq!(plan.days[1].cumulative, 100);
        assert_eq!(plan.total(), 100);
        assert_eq!(plan.days[1].date, NaiveDate::from_ymd_opt(2025, 10, 2).unwrap());
    }

    #[test]
    fn test_ramp_reaches_max_and_stays() {
        let plan = plan(850, &ramp(100, 50, 200), start()).unwrap();
        let quotas: Vec<u64> = plan.days.iter().map(|d| d.quota).collect();
        assert_eq!(quotas, vec![100, 150, 200, 200, 200]);
        assert_eq!(plan.total(), 850);
        assert_eq!(plan.last_date(), NaiveDate::from_ymd_opt(2025, 10, 5));
    }

    #[test]
    fn test_zero_increase_is_flat() {
        let plan = plan(10, &ramp(3, 0, 3), start()).unwrap();
        let quotas: Vec<u64> = plan.days.iter().map(|d| d.quota).collect();
        assert_eq!(quotas, vec![3, 3, 3, 1]);
    }

    #[test]
    fn test_empty_audience() {
        let plan = plan(0, &RampConfig::default(), start()).unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.total(), 0);
        assert_eq!(plan.last_date(), None);
    }

    #[test]
    fn test_audience_smaller_than_first_day() {
        let plan = plan(7, &RampConfig::default(), start()).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.days[0].quota, 7);
    }

    #[test]
    fn test_invalid_configs() {
        assert_eq!(
            plan(100, &ramp(0, 10, 200), start()),
            Err(ConfigError::ZeroInitialQuota)
        );
        assert!(matches!(
            plan(100, &ramp(50, 10, 40), start()),
            Err(ConfigError::MaxBelowInitial { .. })
        ));
        // Validation runs even when there is nothing to send.
        assert!(plan(0, &ramp(0, 0, 0), start()).is_err());
    }

    #[test]
    fn test_cumulative_is_monotonic_and_exact() {
        for audience in [1u64, 49, 50, 51, 999, 12_345] {
            let plan = plan(audience, &ramp(50, 7, 120), start()).unwrap();
            let mut prev = 0;
            for day in &plan.days {
                assert!(day.quota > 0, "audience {audience}: empty day");
                assert_eq!(day.cumulative, prev + day.quota);
                prev = day.cumulative;
            }
            assert_eq!(prev, audience);
        }
    }

    #[test]
    fn test_lookup_by_date() {
        let plan = plan(100, &ramp(50, 10, 200), start()).unwrap();
        let day = plan.day(NaiveDate::from_ymd_opt(2025, 10, 2).unwrap()).unwrap();
        assert_eq!(day.day_index, 1);
        assert!(plan.day(NaiveDate::from_ymd_opt(2025, 10, 3).unwrap()).is_none());
    }
}
