use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
///
/// Every AI setting is optional: without an API key the assistant runs in its
/// deterministic local-fallback mode and the service stays fully usable.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub ai: AiConfig,
    /// FF_UNIQUE_DRAFT_NAMES: when set, draft file names must be unique per
    /// project (case-insensitive). Defaults to on.
    pub enforce_unique_draft_names: bool,
}

/// Settings for the OpenAI-compatible completion endpoint.
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3001".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            ai: AiConfig {
                api_key: std::env::var("OPENAI_KEY").ok().filter(|k| !k.is_empty()),
                base_url: std::env::var("AI_BASE_URL")
                    .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
                model: std::env::var("AI_MODEL").unwrap_or_else(|_| "gpt-4".to_string()),
                temperature: std::env::var("AI_TEMPERATURE")
                    .unwrap_or_else(|_| "0.3".to_string())
                    .parse::<f32>()
                    .context("AI_TEMPERATURE must be a number")?,
                max_tokens: std::env::var("AI_MAX_TOKENS")
                    .unwrap_or_else(|_| "1200".to_string())
                    .parse::<u32>()
                    .context("AI_MAX_TOKENS must be an integer")?,
            },
            enforce_unique_draft_names: env_flag("FF_UNIQUE_DRAFT_NAMES", true),
        })
    }
}

fn env_flag(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(value) => matches!(value.as_str(), "1" | "true" | "on" | "yes"),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_flag_default_applies_when_unset() {
        assert!(env_flag("FF_DOES_NOT_EXIST_ANYWHERE", true));
        assert!(!env_flag("FF_DOES_NOT_EXIST_ANYWHERE", false));
    }
}
