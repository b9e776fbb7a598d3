//! `calmate serve`: Start the HTTP API server.

use calmate_config::AppConfig;

pub async fn run(
    port_override: Option<u16>,
    host_override: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }
    if let Some(host) = host_override {
        config.gateway.host = host;
    }

    if !config.has_api_key() {
        return Err(super::chat::missing_key_message().into());
    }

    println!("CalMate gateway");
    println!("   Listening: http://{}:{}", config.gateway.host, config.gateway.port);
    println!("   Model:     {} ({})", config.default_model, config.default_provider);
    println!("   Calendar:  {} ({})", config.calendar.backend, config.calendar.calendar_id);

    calmate_gateway::start(config).await?;

    Ok(())
}
