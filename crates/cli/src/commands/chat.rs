//! `calmate chat`: Interactive or single-message chat mode.

use calmate_agent::ChatService;
use calmate_config::AppConfig;
use calmate_core::error::AgentError;
use calmate_core::message::SessionId;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

/// Words that end an interactive session.
const EXIT_WORDS: [&str; 4] = ["exit", "quit", "e", "q"];

pub(crate) fn missing_key_message() -> String {
    format!(
        "No API key configured.\n\n  \
         Set one of these environment variables:\n    \
         GEMINI_API_KEY=...    (default provider)\n    \
         OPENAI_API_KEY=...    (with CALMATE_PROVIDER=openai)\n    \
         CALMATE_API_KEY=...   (any provider)\n\n  \
         Or add it to {}",
        AppConfig::config_dir().join("config.toml").display()
    )
}

pub async fn run(message: Option<String>, session: String) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    if !config.has_api_key() {
        return Err(missing_key_message().into());
    }

    let chat = ChatService::from_config(&config)?;
    let session = SessionId::new(session);
    debug!(session = %session, model = chat.model(), "Chat service ready");

    if let Some(msg) = message {
        eprint!("  Thinking...");
        let outcome = chat.handle(&session, &msg).await;
        eprint!("\r              \r");
        println!("{}", outcome?.reply);
        return Ok(());
    }

    println!();
    println!("  CalMate interactive mode");
    println!();
    println!("  Model:     {} ({})", config.default_model, config.default_provider);
    println!("  Calendar:  {} ({})", config.calendar.backend, config.calendar.calendar_id);
    println!("  Tools:     {}", chat.tools().names().join(", "));
    println!("  Time zone: {}", config.agent.default_timezone);
    println!();
    println!("  Type your message and press Enter. 'exit' or 'q' quits.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let command = line.trim();
        if command.is_empty() {
            continue;
        }
        if is_exit(command) {
            break;
        }

        eprint!("  ...");
        let outcome = chat.handle(&session, &line).await;
        eprint!("\r     \r");
        match outcome {
            Ok(outcome) => {
                println!();
                for text in outcome.reply.lines() {
                    println!("  CalMate > {text}");
                }
                println!();
            }
            Err(AgentError::ModelUnavailable(e)) => {
                eprintln!("  [Model unavailable] {e}");
                println!();
            }
            Err(e) => {
                eprintln!("  [Error] {e}");
                println!();
            }
        }
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}

fn is_exit(line: &str) -> bool {
    EXIT_WORDS.contains(&line.to_lowercase().as_str())
}
