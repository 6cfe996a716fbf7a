//! Intelligent delivery — daily ramp-up planning, in-day batch/rest pacing,
//! per-campaign-day throttling, funnel and status scheduling.

pub mod activation;
pub mod funnel;
pub mod pacing;
pub mod ramp;
pub mod status_schedule;
pub mod throttle;

pub use activation::{activate, ActivatedCampaign};
pub use funnel::{FunnelSchedule, FunnelStep, MAX_FUNNEL_MESSAGES};
pub use pacing::{send_timestamps, SendTimestamps};
pub use ramp::{plan, DaySchedule, DispatchPlan};
pub use status_schedule::{next_due, MediaType, Repeat, StatusPost, StatusSchedule};
pub use throttle::{Admission, DispatchCursor, DispatchThrottle};
