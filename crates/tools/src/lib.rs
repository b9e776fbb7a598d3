//! Built-in tool implementations for CalMate.
//!
//! Tools give the assistant its hands: read the clock, list, read, create,
//! edit and delete calendar events, and search the web. Calendar tools
//! talk to an injected `CalendarBackend`; nothing here knows which
//! calendar service sits behind it.

pub mod create_event;
pub mod current_time;
pub mod delete_event;
pub mod edit_event;
pub mod get_event;
pub mod list_events;
pub mod schedule;
pub mod web_search;

use calmate_core::calendar::CalendarBackend;
use calmate_core::error::RegistryError;
use calmate_core::tool::ToolRegistry;
use std::sync::Arc;

pub use create_event::COLOR_GUIDE;
pub use schedule::ScheduleSettings;
pub use web_search::{SearchBackend, SearchHit, TavilySearch};

/// Web search wiring for [`calendar_registry`].
pub struct SearchSetup {
    pub backend: Arc<dyn SearchBackend>,
    pub default_results: u32,
}

/// Build the registry exposed to the model.
///
/// `web_search` is only registered when a search backend is configured.
pub fn calendar_registry(
    calendar: Arc<dyn CalendarBackend>,
    settings: ScheduleSettings,
    search: Option<SearchSetup>,
) -> Result<ToolRegistry, RegistryError> {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(current_time::CurrentTimeTool::new(settings.clone())))?;
    registry.register(Box::new(list_events::ListEventsTool::new(
        calendar.clone(),
        settings.clone(),
    )))?;
    registry.register(Box::new(get_event::GetEventTool::new(calendar.clone())))?;
    registry.register(Box::new(create_event::CreateEventTool::new(
        calendar.clone(),
        settings.clone(),
    )))?;
    registry.register(Box::new(edit_event::EditEventTool::new(
        calendar.clone(),
        settings,
    )))?;
    registry.register(Box::new(delete_event::DeleteEventTool::new(calendar)))?;

    if let Some(search) = search {
        registry.register(Box::new(web_search::WebSearchTool::new(
            search.backend,
            search.default_results,
        )))?;
    }
    Ok(registry)
}


#[cfg(test)]
mod tests {
    use super::*;
    use calmate_calendar::InMemoryCalendar;

    #[test]
    fn registry_without_search_has_six_tools() {
        let registry = calendar_registry(
            Arc::new(InMemoryCalendar::new()),
            ScheduleSettings::default(),
            None,
        )
        .unwrap();
        assert_eq!(
            registry.names(),
            vec![
                "current_time",
                "list_events",
                "get_event",
                "create_event",
                "edit_event",
                "delete_event"
            ]
        );
    }

    #[test]
    fn search_is_registered_when_configured() {
        let registry = calendar_registry(
            Arc::new(InMemoryCalendar::new()),
            ScheduleSettings::default(),
            Some(SearchSetup {
                backend: Arc::new(TavilySearch::new("tvly-test")),
                default_results: 5,
            }),
        )
        .unwrap();
        assert!(registry.get("web_search").is_some());
        assert_eq!(registry.len(), 7);
    }

    #[test]
    fn every_definition_is_an_object_schema() {
        let registry = calendar_registry(
            Arc::new(InMemoryCalendar::new()),
            ScheduleSettings::default(),
            None,
        )
        .unwrap();
        for def in registry.definitions() {
            assert_eq!(def.parameters["type"], "object", "{}", def.name);
            assert!(!def.description.is_empty());
        }
    }
}
