//! Calendar domain: events as exchanged with the remote calendar, the
//! backend trait, and the scheduling rules built on top of them.
//!
//! The assistant never owns events: it builds `NewEvent` bodies and asks a
//! `CalendarBackend` to store them under backend-assigned ids. Field names
//! serialize in the camelCase shape used by the Google Calendar API.

pub mod conflict;
pub mod window;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CalendarError;

pub use conflict::{DEFAULT_BUFFER_MINUTES, find_conflicts, search_window};
pub use window::{DayWindow, day_window, parse_timezone, today};

/// Start or end of an event. Timed events carry `date_time`; all-day
/// events carry `date`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<DateTime<FixedOffset>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,

    /// IANA zone name, e.g. "America/New_York"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl EventTime {
    pub fn at(date_time: DateTime<FixedOffset>, time_zone: impl Into<String>) -> Self {
        Self {
            date_time: Some(date_time),
            date: None,
            time_zone: Some(time_zone.into()),
        }
    }

    pub fn all_day(date: NaiveDate) -> Self {
        Self {
            date_time: None,
            date: Some(date),
            time_zone: None,
        }
    }

    /// The instant of a timed boundary; `None` for all-day boundaries.
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        self.date_time.map(|dt| dt.with_timezone(&Utc))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    pub email: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_status: Option<String>,
}

/// An event as stored by the calendar backend.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,

    #[serde(default)]
    pub summary: String,

    #[serde(default)]
    pub location: String,

    #[serde(default)]
    pub description: String,

    pub start: EventTime,

    pub end: EventTime,

    /// RFC 5545 RRULE/EXRULE/RDATE/EXDATE lines
    #[serde(default)]
    pub recurrence: Vec<String>,

    #[serde(default)]
    pub attendees: Vec<Attendee>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_id: Option<String>,
}

impl CalendarEvent {
    pub fn from_new(id: impl Into<String>, event: NewEvent) -> Self {
        Self {
            id: id.into(),
            summary: event.summary,
            location: event.location,
            description: event.description,
            start: event.start,
            end: event.end,
            recurrence: event.recurrence,
            attendees: event.attendees,
            color_id: event.color_id,
        }
    }

    /// The writable body of this event, for read-modify-write edits.
    pub fn to_new(&self) -> NewEvent {
        NewEvent {
            summary: self.summary.clone(),
            location: self.location.clone(),
            description: self.description.clone(),
            start: self.start.clone(),
            end: self.end.clone(),
            recurrence: self.recurrence.clone(),
            attendees: self.attendees.clone(),
            color_id: self.color_id.clone(),
        }
    }

    /// The occupied span of a timed event.
    pub fn span(&self) -> Option<TimeSpan> {
        TimeSpan::new(self.start.instant()?, self.end.instant()?)
    }
}

/// Body of an event to create or replace.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    pub summary: String,

    #[serde(default)]
    pub location: String,

    #[serde(default)]
    pub description: String,

    pub start: EventTime,

    pub end: EventTime,

    #[serde(default)]
    pub recurrence: Vec<String>,

    #[serde(default)]
    pub attendees: Vec<Attendee>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_id: Option<String>,
}

impl NewEvent {
    pub fn span(&self) -> Option<TimeSpan> {
        TimeSpan::new(self.start.instant()?, self.end.instant()?)
    }
}

/// A half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSpan {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeSpan {
    /// Returns `None` unless `end` is after `start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        (end > start).then_some(Self { start, end })
    }
}

/// Parameters for listing events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQuery {
    /// Lower bound on event end time
    pub time_min: DateTime<FixedOffset>,

    /// Upper bound on event start time
    pub time_max: Option<DateTime<FixedOffset>>,

    pub max_results: u32,
}

/// A remote store of events keyed by opaque ids.
#[async_trait]
pub trait CalendarBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Events overlapping the query window, soonest first, expanded into
    /// single instances.
    async fn list_events(&self, query: EventQuery) -> Result<Vec<CalendarEvent>, CalendarError>;

    async fn get_event(&self, id: &str) -> Result<CalendarEvent, CalendarError>;

    async fn create_event(&self, event: NewEvent) -> Result<CalendarEvent, CalendarError>;

    async fn update_event(&self, id: &str, event: NewEvent) -> Result<CalendarEvent, CalendarError>;

    async fn delete_event(&self, id: &str) -> Result<(), CalendarError>;
}
