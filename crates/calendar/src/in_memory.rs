//! In-process calendar for tests and offline use.
//!
//! Ids are assigned sequentially (`evt_1`, `evt_2`, …). Recurrence rules
//! are stored but not expanded; each event is one instance.

use async_trait::async_trait;
use calmate_core::calendar::{CalendarBackend, CalendarEvent, EventQuery, EventTime, NewEvent};
use calmate_core::error::CalendarError;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryCalendar {
    events: RwLock<BTreeMap<String, CalendarEvent>>,
    next_id: AtomicU64,
    /// Number of successful writes; lets tests assert the calendar was
    /// left untouched.
    writes: AtomicU64,
}

/// An all-day boundary counts from midnight UTC of its date.
fn boundary(time: &EventTime) -> Option<DateTime<Utc>> {
    time.instant()
        .or_else(|| time.date.map(|d| d.and_time(chrono::NaiveTime::MIN).and_utc()))
}

fn validate(event: &NewEvent) -> Result<(), CalendarError> {
    let (Some(start), Some(end)) = (boundary(&event.start), boundary(&event.end)) else {
        return Err(CalendarError::InvalidEvent(
            "start and end need a dateTime or date".into(),
        ));
    };
    if end <= start {
        return Err(CalendarError::InvalidEvent(
            "end must be after start".into(),
        ));
    }
    Ok(())
}

impl InMemoryCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed events directly, bypassing the write counter.
    pub fn with_events(events: impl IntoIterator<Item = NewEvent>) -> Self {
        let mut calendar = Self::new();
        for event in events {
            let id = calendar.allocate_id();
            calendar
                .events
                .get_mut()
                .insert(id.clone(), CalendarEvent::from_new(id, event));
        }
        calendar
    }

    fn allocate_id(&self) -> String {
        format!("evt_{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }
}

#[async_trait]
impl CalendarBackend for InMemoryCalendar {
    fn name(&self) -> &str {
        "memory"
    }

    async fn list_events(&self, query: EventQuery) -> Result<Vec<CalendarEvent>, CalendarError> {
        let min = query.time_min.with_timezone(&Utc);
        let max = query.time_max.map(|t| t.with_timezone(&Utc));

        let store = self.events.read().await;
        let mut matching: Vec<(DateTime<Utc>, &CalendarEvent)> = store
            .values()
            .filter_map(|e| Some((boundary(&e.start)?, boundary(&e.end)?, e)))
            .filter(|(start, end, _)| *end > min && max.is_none_or(|m| *start < m))
            .map(|(start, _, e)| (start, e))
            .collect();
        matching.sort_by_key(|(start, _)| *start);

        Ok(matching
            .into_iter()
            .take(query.max_results as usize)
            .map(|(_, e)| e.clone())
            .collect())
    }

    async fn get_event(&self, id: &str) -> Result<CalendarEvent, CalendarError> {
        self.events
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| CalendarError::NotFound(id.to_string()))
    }

    async fn create_event(&self, event: NewEvent) -> Result<CalendarEvent, CalendarError> {
        validate(&event)?;
        let id = self.allocate_id();
        let created = CalendarEvent::from_new(id.clone(), event);
        self.events.write().await.insert(id, created.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(created)
    }

    async fn update_event(&self, id: &str, event: NewEvent) -> Result<CalendarEvent, CalendarError> {
        validate(&event)?;
        let mut store = self.events.write().await;
        let slot = store
            .get_mut(id)
            .ok_or_else(|| CalendarError::NotFound(id.to_string()))?;
        *slot = CalendarEvent::from_new(id, event);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(slot.clone())
    }

    async fn delete_event(&self, id: &str) -> Result<(), CalendarError> {
        self.events
            .write()
            .await
            .remove(id)
            .ok_or_else(|| CalendarError::NotFound(id.to_string()))?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
