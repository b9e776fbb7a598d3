//! Calendar backends for CalMate.
//!
//! All backends implement `calmate_core::CalendarBackend`. The Google
//! backend is authenticated through an injected `TokenSource`.

pub mod auth;
pub mod google;
pub mod in_memory;

pub use auth::{RefreshingToken, StaticToken, TokenSource};
pub use google::GoogleCalendar;
pub use in_memory::InMemoryCalendar;

use calmate_config::CalendarConfig;
use calmate_core::calendar::CalendarBackend;
use calmate_core::error::CalendarError;
use std::sync::Arc;

/// Build the configured calendar backend.
///
/// For Google, a refresh token (with client id and secret) is preferred
/// over a static access token, which expires after an hour.
pub fn build_from_config(config: &CalendarConfig) -> Result<Arc<dyn CalendarBackend>, CalendarError> {
    match config.backend.as_str() {
        "memory" => Ok(Arc::new(InMemoryCalendar::new())),
        "google" => {
            let tokens: Arc<dyn TokenSource> = match (
                &config.client_id,
                &config.client_secret,
                &config.refresh_token,
                &config.access_token,
            ) {
                (Some(id), Some(secret), Some(refresh), _) => {
                    Arc::new(RefreshingToken::new(id, secret, refresh))
                }
                (_, _, _, Some(token)) => Arc::new(StaticToken::new(token)),
                _ => {
                    return Err(CalendarError::Auth(
                        "no Google credentials: set GOOGLE_CALENDAR_TOKEN or \
                         GOOGLE_CLIENT_ID, GOOGLE_CLIENT_SECRET and GOOGLE_REFRESH_TOKEN"
                            .into(),
                    ));
                }
            };
            Ok(Arc::new(GoogleCalendar::new(&config.calendar_id, tokens)))
        }
        other => Err(CalendarError::InvalidEvent(format!(
            "unknown calendar backend '{other}'"
        ))),
    }
}
