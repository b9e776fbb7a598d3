//! Provider selection: turns `default_provider` plus its optional
//! `[providers.<name>]` table into a ready client.

use crate::openai_compat::OpenAiCompatProvider;
use calmate_config::AppConfig;
use tracing::debug;

/// Build the configured default provider.
///
/// The `[providers.<name>]` entry wins for key and URL; otherwise the
/// top-level `api_key` and the well-known base URL for the name are used.
pub fn build_from_config(config: &AppConfig) -> OpenAiCompatProvider {
    let name = config.default_provider.as_str();
    let entry = config.providers.get(name);

    let api_key = entry
        .and_then(|p| p.api_key.clone())
        .or_else(|| config.api_key.clone())
        .unwrap_or_default();
    let base_url = entry
        .and_then(|p| p.api_url.clone())
        .unwrap_or_else(|| default_base_url(name));

    let provider = OpenAiCompatProvider::new(name, base_url, api_key);
    debug!(provider = name, base_url = provider.base_url(), "Provider configured");
    provider
}

/// Get the default base URL for well-known providers.
pub fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "gemini" | "google" => "https://generativelanguage.googleapis.com/v1beta/openai".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "vllm" => "http://localhost:8001/v1".into(),
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}
