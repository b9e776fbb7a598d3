//! `calmate tools`: List the tools exposed to the model.

use calmate_calendar::InMemoryCalendar;
use calmate_config::AppConfig;
use calmate_tools::{ScheduleSettings, SearchSetup, TavilySearch, calendar_registry};
use std::sync::Arc;

pub async fn run(schema: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    // Listing never touches the calendar, so no credentials are needed.
    let settings = ScheduleSettings::new(
        &config.agent.default_timezone,
        config.agent.conflict_buffer_minutes,
    )?;
    let search = config.search.api_key.as_deref().map(|key| SearchSetup {
        backend: Arc::new(TavilySearch::new(key)),
        default_results: config.search.max_results,
    });
    let registry = calendar_registry(Arc::new(InMemoryCalendar::new()), settings, search)?;

    if schema {
        println!("{}", serde_json::to_string_pretty(&registry.definitions())?);
        return Ok(());
    }

    println!("{} tools:", registry.len());
    for spec in registry.describe_all() {
        let params: Vec<String> = spec
            .params
            .iter()
            .map(|p| {
                if p.required {
                    p.name.clone()
                } else {
                    format!("[{}]", p.name)
                }
            })
            .collect();
        println!();
        println!("  {}({})", spec.name, params.join(", "));
        println!("      {}", spec.description);
    }
    if config.search.api_key.is_none() {
        println!();
        println!("  web_search is disabled: set TAVILY_API_KEY to enable it.");
    }
    Ok(())
}
