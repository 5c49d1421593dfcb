use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::CatedraError;

const DEFAULT_MODEL: &str = "claude-haiku-4-5-20251001";
const DEFAULT_PACING_MS: u64 = 800;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_PAGES: u32 = 50;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Backend
    pub api_url: String,
    pub max_pages: u32,

    // Analysis provider
    pub anthropic_api_key: Option<String>,
    pub model: String,

    // Audit pacing
    pub pacing: Duration,
    pub analysis_timeout: Duration,
}

impl Config {
    /// Load configuration from the process environment (and `.env` if present).
    pub fn from_env() -> Result<Self, CatedraError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup. `from_env` delegates here.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CatedraError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("CATEDRA_API_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                CatedraError::Config("CATEDRA_API_URL environment variable is required".into())
            })?;

        Ok(Self {
            api_url,
            max_pages: parse_or(&lookup, "BACKEND_MAX_PAGES", DEFAULT_MAX_PAGES)?,
            anthropic_api_key: lookup("ANTHROPIC_API_KEY").filter(|v| !v.is_empty()),
            model: lookup("CATEDRA_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            pacing: Duration::from_millis(parse_or(&lookup, "AUDIT_PACING_MS", DEFAULT_PACING_MS)?),
            analysis_timeout: Duration::from_secs(parse_or(
                &lookup,
                "AUDIT_TIMEOUT_SECS",
                DEFAULT_TIMEOUT_SECS,
            )?),
        })
    }

    /// Log the loaded configuration with secrets truncated.
    pub fn log_redacted(&self) {
        fn preview_opt(val: &Option<String>) -> String {
            match val {
                Some(v) if !v.is_empty() => {
                    let n = v.char_indices().nth(5).map(|(i, _)| i).unwrap_or(v.len());
                    format!("{}...({} chars)", &v[..n], v.len())
                }
                _ => "<not set>".to_string(),
            }
        }

        tracing::info!("Config loaded:");
        tracing::info!("  CATEDRA_API_URL: {}", self.api_url);
        tracing::info!("  BACKEND_MAX_PAGES: {}", self.max_pages);
        tracing::info!("  ANTHROPIC_API_KEY: {}", preview_opt(&self.anthropic_api_key));
        tracing::info!("  CATEDRA_MODEL: {}", self.model);
        tracing::info!("  AUDIT_PACING_MS: {}", self.pacing.as_millis());
        tracing::info!("  AUDIT_TIMEOUT_SECS: {}", self.analysis_timeout.as_secs());
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, CatedraError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| CatedraError::InvalidValue {
            key: key.to_string(),
            value: raw,
        }),
    }
}
