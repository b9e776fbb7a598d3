//! Google Calendar v3 REST backend.

use async_trait::async_trait;
use calmate_core::calendar::{CalendarBackend, CalendarEvent, EventQuery, NewEvent};
use calmate_core::error::CalendarError;
use chrono::SecondsFormat;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::auth::TokenSource;

pub const GOOGLE_CALENDAR_API: &str = "https://www.googleapis.com/calendar/v3";

/// Talks to one calendar (default `primary`) of one account.
pub struct GoogleCalendar {
    client: reqwest::Client,
    base_url: String,
    calendar_id: String,
    tokens: Arc<dyn TokenSource>,
}

#[derive(Debug, Deserialize)]
struct EventList {
    #[serde(default)]
    items: Vec<CalendarEvent>,
}

impl GoogleCalendar {
    pub fn new(calendar_id: impl Into<String>, tokens: Arc<dyn TokenSource>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: GOOGLE_CALENDAR_API.into(),
            calendar_id: calendar_id.into(),
            tokens,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// `{base}/calendars/{calendarId}/events[/{eventId}]`, with ids
    /// percent-encoded as path segments.
    fn events_url(&self, event_id: Option<&str>) -> Result<reqwest::Url, CalendarError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| CalendarError::Network(format!("invalid calendar base URL: {e}")))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| CalendarError::Network("calendar base URL cannot be a base".into()))?;
            segments.pop_if_empty();
            segments.extend(["calendars", self.calendar_id.as_str(), "events"]);
            if let Some(id) = event_id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    /// Write body: the event plus default reminders.
    fn write_body(event: &NewEvent) -> Result<serde_json::Value, CalendarError> {
        let mut body = serde_json::to_value(event)
            .map_err(|e| CalendarError::InvalidEvent(e.to_string()))?;
        body["reminders"] = serde_json::json!({ "useDefault": true });
        Ok(body)
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        event_id: Option<&str>,
    ) -> Result<reqwest::Response, CalendarError> {
        let token = self.tokens.access_token().await?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| CalendarError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if response.status().is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        warn!(status, body = %body, "Calendar API returned error");
        Err(map_status(status, event_id, body))
    }
}

fn map_status(status: u16, event_id: Option<&str>, body: String) -> CalendarError {
    match status {
        404 | 410 => CalendarError::NotFound(event_id.unwrap_or("calendar").to_string()),
        401 | 403 => CalendarError::Auth(body),
        _ => CalendarError::Api {
            status_code: status,
            message: body,
        },
    }
}

fn decode_error(e: reqwest::Error) -> CalendarError {
    CalendarError::Api {
        status_code: 200,
        message: format!("Failed to parse calendar response: {e}"),
    }
}

#[async_trait]
impl CalendarBackend for GoogleCalendar {
    fn name(&self) -> &str {
        "google"
    }

    async fn list_events(&self, query: EventQuery) -> Result<Vec<CalendarEvent>, CalendarError> {
        let mut params = vec![
            (
                "timeMin",
                query.time_min.to_rfc3339_opts(SecondsFormat::Secs, false),
            ),
            ("maxResults", query.max_results.to_string()),
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
        ];
        if let Some(max) = query.time_max {
            params.push(("timeMax", max.to_rfc3339_opts(SecondsFormat::Secs, false)));
        }

        debug!(calendar = %self.calendar_id, ?params, "Listing events");
        let url = self.events_url(None)?;
        let response = self.send(self.client.get(url).query(&params), None).await?;
        let list: EventList = response.json().await.map_err(decode_error)?;
        Ok(list.items)
    }

    async fn get_event(&self, id: &str) -> Result<CalendarEvent, CalendarError> {
        let url = self.events_url(Some(id))?;
        let response = self.send(self.client.get(url), Some(id)).await?;
        response.json().await.map_err(decode_error)
    }

    async fn create_event(&self, event: NewEvent) -> Result<CalendarEvent, CalendarError> {
        let url = self.events_url(None)?;
        let body = Self::write_body(&event)?;
        let response = self.send(self.client.post(url).json(&body), None).await?;
        response.json().await.map_err(decode_error)
    }

    async fn update_event(&self, id: &str, event: NewEvent) -> Result<CalendarEvent, CalendarError> {
        let url = self.events_url(Some(id))?;
        let body = Self::write_body(&event)?;
        let response = self.send(self.client.put(url).json(&body), Some(id)).await?;
        response.json().await.map_err(decode_error)
    }

    async fn delete_event(&self, id: &str) -> Result<(), CalendarError> {
        let url = self.events_url(Some(id))?;
        self.send(self.client.delete(url), Some(id)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticToken;
    use axum::extract::{Path, Query};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::get;
    use axum::{Json, Router};
    use calmate_core::calendar::EventTime;
    use chrono::DateTime;
    use std::collections::HashMap;

    fn sample_event(id: &str) -> serde_json::Value {
        serde_json::json!({
            "kind": "calendar#event",
            "id": id,
            "summary": "Advisor meeting",
            "start": {"dateTime": "2026-10-19T10:00:00-04:00", "timeZone": "America/New_York"},
            "end": {"dateTime": "2026-10-19T11:00:00-04:00", "timeZone": "America/New_York"}
        })
    }

    fn authorized(headers: &HeaderMap) -> bool {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            == Some("Bearer ya29.test")
    }

    /// Minimal stand-in for the Calendar v3 events collection.
    async fn serve_fake_api() -> String {
        let app = Router::new()
            .route(
                "/calendars/{calendar}/events",
                get(
                    |Path(calendar): Path<String>,
                     headers: HeaderMap,
                     Query(q): Query<HashMap<String, String>>| async move {
                        if !authorized(&headers) {
                            return (StatusCode::UNAUTHORIZED, Json(serde_json::json!({})));
                        }
                        assert_eq!(calendar, "primary");
                        assert_eq!(q["singleEvents"], "true");
                        assert_eq!(q["orderBy"], "startTime");
                        assert!(q.contains_key("timeMin"));
                        (
                            StatusCode::OK,
                            Json(serde_json::json!({ "items": [sample_event("evt_a")] })),
                        )
                    },
                )
                .post(|Json(body): Json<serde_json::Value>| async move {
                    assert_eq!(body["reminders"]["useDefault"], true);
                    let mut created = body.clone();
                    created["id"] = serde_json::json!("new_1");
                    (StatusCode::OK, Json(created))
                }),
            )
            .route(
                "/calendars/{calendar}/events/{id}",
                get(|Path((_, id)): Path<(String, String)>| async move {
                    if id == "evt_a" {
                        (StatusCode::OK, Json(sample_event("evt_a")))
                    } else {
                        (StatusCode::NOT_FOUND, Json(serde_json::json!({"error": "nf"})))
                    }
                })
                .delete(|Path((_, id)): Path<(String, String)>| async move {
                    if id == "gone" {
                        StatusCode::GONE
                    } else {
                        StatusCode::NO_CONTENT
                    }
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn backend(base: &str, token: &str) -> GoogleCalendar {
        GoogleCalendar::new("primary", Arc::new(StaticToken::new(token))).with_base_url(base)
    }

    #[test]
    fn event_ids_are_encoded_as_path_segments() {
        let cal = GoogleCalendar::new(
            "en.usa#holiday@group.v.calendar.google.com",
            Arc::new(StaticToken::new("t")),
        );
        let url = cal.events_url(Some("a/b")).unwrap();
        assert!(url.as_str().contains("en.usa%23holiday@group.v.calendar.google.com"));
        assert!(url.as_str().ends_with("/events/a%2Fb"));
    }

    #[tokio::test]
    async fn list_events_sends_query_and_decodes_items() {
        let base = serve_fake_api().await;
        let cal = backend(&base, "ya29.test");
        let query = EventQuery {
            time_min: DateTime::parse_from_rfc3339("2026-10-19T00:00:00-04:00").unwrap(),
            time_max: Some(DateTime::parse_from_rfc3339("2026-10-20T00:00:00-04:00").unwrap()),
            max_results: 10,
        };
        let events = cal.list_events(query).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].summary, "Advisor meeting");
    }

    #[tokio::test]
    async fn bad_token_is_an_auth_error() {
        let base = serve_fake_api().await;
        let cal = backend(&base, "wrong");
        let query = EventQuery {
            time_min: DateTime::parse_from_rfc3339("2026-10-19T00:00:00-04:00").unwrap(),
            time_max: None,
            max_results: 10,
        };
        assert!(matches!(cal.list_events(query).await, Err(CalendarError::Auth(_))));
    }

    #[tokio::test]
    async fn missing_event_maps_to_not_found() {
        let base = serve_fake_api().await;
        let cal = backend(&base, "ya29.test");
        assert_eq!(cal.get_event("evt_a").await.unwrap().id, "evt_a");
        match cal.get_event("nope").await {
            Err(CalendarError::NotFound(id)) => assert_eq!(id, "nope"),
            other => panic!("expected NotFound, got {other:?}"),
        }
        assert!(matches!(
            cal.delete_event("gone").await,
            Err(CalendarError::NotFound(_))
        ));
        cal.delete_event("evt_a").await.unwrap();
    }

    #[tokio::test]
    async fn create_sends_default_reminders() {
        let base = serve_fake_api().await;
        let cal = backend(&base, "ya29.test");
        let start = DateTime::parse_from_rfc3339("2026-10-20T14:00:00-04:00").unwrap();
        let created = cal
            .create_event(NewEvent {
                summary: "Study group".into(),
                start: EventTime::at(start, "America/New_York"),
                end: EventTime::at(start + chrono::Duration::hours(1), "America/New_York"),
                color_id: Some("3".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(created.id, "new_1");
        assert_eq!(created.color_id.as_deref(), Some("3"));
    }
}
