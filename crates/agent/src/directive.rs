//! The system directive prepended to every model request.
//!
//! The persona paragraph can be replaced from config. The scheduling rules
//! below it cannot.

use calmate_config::AppConfig;
use calmate_tools::COLOR_GUIDE;

const DEFAULT_PERSONA: &str = "You are CalMate, an assistant that manages the user's Google \
Calendar. Use the available tools and otherwise act as a regular chatbot, matching the \
user's energy. Answer as directly as possible.";

/// Persona plus the non-negotiable scheduling rules.
#[derive(Debug, Clone)]
pub struct SystemDirective {
    persona: String,
    timezone: String,
    buffer_minutes: i64,
}

impl SystemDirective {
    pub fn new(timezone: impl Into<String>) -> Self {
        Self {
            persona: DEFAULT_PERSONA.into(),
            timezone: timezone.into(),
            buffer_minutes: 30,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let mut directive = Self::new(&config.agent.default_timezone)
            .with_buffer_minutes(config.agent.conflict_buffer_minutes);
        if let Some(persona) = config.identity.system_prompt_override.as_deref() {
            directive = directive.with_persona(persona);
        }
        directive
    }

    /// Replace the persona paragraph. Blank text keeps the default.
    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        let persona = persona.into();
        if !persona.trim().is_empty() {
            self.persona = persona.trim().to_string();
        }
        self
    }

    pub fn with_buffer_minutes(mut self, minutes: i64) -> Self {
        self.buffer_minutes = minutes;
        self
    }

    pub fn render(&self) -> String {
        let buffer = self.buffer_minutes;
        format!(
            "{persona}\n\n\
             Rules:\n\
             - For anything about the calendar, dates or times, call a tool instead of guessing. \
             Call current_time before interpreting words like \"today\" or \"next Friday\".\n\
             - Never ask the user for an event id. Find it with list_events.\n\
             - For new events clarify only the start time. Infer every other field from the \
             message; the end defaults to one hour after the start.\n\
             - Before creating or editing an event, check the events around the proposed time. \
             An existing event conflicts if it overlaps, ends within {buffer} minutes before the \
             new start, or starts within {buffer} minutes after the new end. Tell the user about \
             any conflict and get their confirmation before going ahead.\n\
             - When the user asks about a specific day, query exactly that calendar day from \
             midnight to midnight, not a rolling 24 hours. If they ask for today's events, do \
             not include tomorrow's.\n\
             - Unless the user says otherwise, times are in {timezone}.\n\
             - {colors}.",
            persona = self.persona,
            timezone = self.timezone,
            colors = COLOR_GUIDE,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rules_mention_timezone_and_buffer() {
        let text = SystemDirective::new("Europe/Berlin").render();
        assert!(text.starts_with("You are CalMate"));
        assert!(text.contains("Europe/Berlin"));
        assert!(text.contains("within 30 minutes"));
        assert!(text.contains("list_events"));
        assert!(text.contains("\"9\" classes"));
    }

    #[test]
    fn override_replaces_persona_only() {
        let mut config = AppConfig::default();
        config.identity.system_prompt_override = Some("You are Jeeves.".into());
        config.agent.conflict_buffer_minutes = 45;

        let text = SystemDirective::from_config(&config).render();
        assert!(text.starts_with("You are Jeeves."));
        assert!(!text.contains("You are CalMate"));
        assert!(text.contains("Never ask the user for an event id"));
        assert!(text.contains("within 45 minutes"));
    }

    #[test]
    fn blank_override_is_ignored() {
        let text = SystemDirective::new("UTC").with_persona("   ").render();
        assert!(text.starts_with("You are CalMate"));
    }
}
