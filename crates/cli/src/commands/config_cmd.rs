//! `calmate config`: Configuration management commands.

use calmate_config::AppConfig;
use clap::Subcommand;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective configuration (secrets redacted)
    Show,
    /// Print the config file path
    Path,
    /// Check the configuration for problems
    Validate,
}

pub async fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Init { force } => init(force),
        ConfigAction::Show => show(),
        ConfigAction::Path => {
            println!("{}", AppConfig::config_dir().join("config.toml").display());
            Ok(())
        }
        ConfigAction::Validate => validate(),
    }
}

fn init(force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let dir = AppConfig::config_dir();
    let path = dir.join("config.toml");
    if path.exists() && !force {
        return Err(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )
        .into());
    }
    std::fs::create_dir_all(&dir)?;
    std::fs::write(&path, AppConfig::default_toml())?;
    println!("Wrote {}", path.display());
    println!("Next: set GEMINI_API_KEY and GOOGLE_CALENDAR_TOKEN (or the GOOGLE_CLIENT_* refresh settings).");
    Ok(())
}

fn show() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    println!("{config:#?}");
    Ok(())
}

fn validate() -> Result<(), Box<dyn std::error::Error>> {
    println!("Validating configuration...");

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            println!("   Config error: {e}");
            return Err(e.into());
        }
    };
    println!("   Config parsed successfully");

    let warnings = warnings(&config);
    if warnings.is_empty() {
        println!("   All checks passed");
    } else {
        println!();
        for w in &warnings {
            println!("   warning: {w}");
        }
    }

    println!();
    println!("   Provider:  {}", config.default_provider);
    println!("   Model:     {}", config.default_model);
    println!("   Gateway:   {}:{}", config.gateway.host, config.gateway.port);
    println!("   Calendar:  {}", config.calendar.backend);
    println!("   Time zone: {}", config.agent.default_timezone);
    Ok(())
}

/// Problems that do not stop the config from loading.
fn warnings(config: &AppConfig) -> Vec<&'static str> {
    let mut warnings = Vec::new();
    if !config.has_api_key() {
        warnings.push("No API key set (GEMINI_API_KEY, OPENAI_API_KEY or CALMATE_API_KEY)");
    }
    if config.calendar.backend == "google"
        && config.calendar.access_token.is_none()
        && !config.calendar.can_refresh()
    {
        warnings.push("No Google Calendar credentials (GOOGLE_CALENDAR_TOKEN or GOOGLE_CLIENT_ID/SECRET/REFRESH_TOKEN)");
    }
    if config.search.api_key.is_none() {
        warnings.push("web_search disabled (TAVILY_API_KEY not set)");
    }
    if config.gateway.host == "0.0.0.0" {
        warnings.push("Gateway is bound to all interfaces");
    }
    warnings
}
