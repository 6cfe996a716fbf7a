//! WhatsApp status scheduling — one-off, daily or weekly status posts.

use campaign_core::{CampaignResult, ConfigError};
use campaign_spintext::{parse, Template};
use chrono::{Datelike, Duration, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "days")]
pub enum Repeat {
    None,
    Daily,
    Weekly(Vec<Weekday>),
}

/// When a status goes out: first at `start`, then at the same time of day per `repeat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSchedule {
    start: NaiveDateTime,
    repeat: Repeat,
}

impl StatusSchedule {
    pub fn new(start: NaiveDateTime, repeat: Repeat) -> Result<Self, ConfigError> {
        if let Repeat::Weekly(days) = &repeat {
            if days.is_empty() {
                return Err(ConfigError::NoWeekdays);
            }
        }
        Ok(Self { start, repeat })
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn repeat(&self) -> &Repeat {
        &self.repeat
    }

    /// First occurrence at or after `after`.
    pub fn next_occurrence(&self, after: NaiveDateTime) -> Option<NaiveDateTime> {
        if after <= self.start {
            return match &self.repeat {
                Repeat::Weekly(days) if !days.contains(&self.start.weekday()) => {
                    self.scan_weekly(self.start, days)
                }
                _ => Some(self.start),
            };
        }
        match &self.repeat {
            Repeat::None => None,
            Repeat::Daily => {
                let candidate = after.date().and_time(self.start.time());
                if candidate >= after {
                    Some(candidate)
                } else {
                    candidate.checked_add_signed(Duration::days(1))
                }
            }
            Repeat::Weekly(days) => self.scan_weekly(after, days),
        }
    }

    fn scan_weekly(&self, after: NaiveDateTime, days: &[Weekday]) -> Option<NaiveDateTime> {
        let mut date = after.date();
        for _ in 0..8 {
            let candidate = date.and_time(self.start.time());
            if candidate >= after && days.contains(&date.weekday()) {
                return Some(candidate);
            }
            date = date.succ_opt()?;
        }
        None
    }

    /// Every occurrence at or after `from`, in order.
    pub fn occurrences(&self, from: NaiveDateTime) -> impl Iterator<Item = NaiveDateTime> + '_ {
        std::iter::successors(self.next_occurrence(from), move |prev| {
            prev.checked_add_signed(Duration::nanoseconds(1))
                .and_then(|t| self.next_occurrence(t))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Text,
    Image,
    Video,
}

/// A scheduled status post. `content` is a spintext template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusPost {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub media_type: MediaType,
    pub media_url: Option<String>,
    pub schedule: StatusSchedule,
    pub active: bool,
}

impl StatusPost {
    pub fn new(title: impl Into<String>, content: impl Into<String>, schedule: StatusSchedule) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            content: content.into(),
            media_type: MediaType::Text,
            media_url: None,
            schedule,
            active: true,
        }
    }

    pub fn with_media(mut self, media_type: MediaType, url: impl Into<String>) -> Self {
        self.media_type = media_type;
        self.media_url = Some(url.into());
        self
    }

    /// Check the post is publishable and return its parsed content.
    pub fn validate(&self) -> CampaignResult<Template> {
        if self.title.trim().is_empty() {
            return Err(ConfigError::Invalid("status title is required".into()).into());
        }
        if self.media_type != MediaType::Text && self.media_url.is_none() {
            return Err(ConfigError::Invalid("image and video statuses need a media file".into()).into());
        }
        if self.media_type == MediaType::Text && self.content.trim().is_empty() {
            return Err(ConfigError::Invalid("text statuses need content".into()).into());
        }
        Ok(parse(&self.content)?)
    }
}

/// The active post due soonest at or after `now`.
pub fn next_due(posts: &[StatusPost], now: NaiveDateTime) -> Option<(&StatusPost, NaiveDateTime)> {
    posts
        .iter()
        .filter(|p| p.active)
        .filter_map(|p| p.schedule.next_occurrence(now).map(|t| (p, t)))
        .min_by_key(|(_, t)| *t)
}
