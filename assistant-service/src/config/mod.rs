use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

/// Default per-collaborator timeout bounds, in seconds.
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 30;
const DEFAULT_STATUS_TIMEOUT_SECS: u64 = 8;
const DEFAULT_WAREHOUSE_TIMEOUT_SECS: u64 = 20;

#[derive(Debug, Clone, Deserialize)]
pub struct AssistantConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    /// Collaborator selection: "gemini" wires the real providers, "mock"
    /// the in-process stand-ins (tests, local development).
    pub provider: String,
    pub gemini: GeminiSettings,
    pub status_api: StatusApiSettings,
    pub warehouse: WarehouseSettings,
    pub timeouts: TimeoutSettings,
    pub rate_limit: RateLimitSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiSettings {
    pub api_key: String,
    pub model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusApiSettings {
    pub api_key: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WarehouseSettings {
    pub base_url: String,
    pub project_id: String,
    /// Dataset-qualified table name, e.g. `flight_data.flights`.
    pub table: String,
    pub access_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutSettings {
    pub llm_secs: u64,
    pub status_secs: u64,
    pub warehouse_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSettings {
    pub chat_per_minute: u32,
}

impl AssistantConfig {
    pub fn load() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        let is_prod = common.environment.is_prod();

        Ok(AssistantConfig {
            common,
            provider: get_env("ASSISTANT_PROVIDER", Some("gemini"), is_prod)?,
            gemini: GeminiSettings {
                api_key: get_env("GEMINI_API_KEY", Some(""), is_prod)?,
                model: get_env("GEMINI_MODEL", Some("gemini-1.5-pro"), is_prod)?,
            },
            status_api: StatusApiSettings {
                api_key: get_env("AVIATIONSTACK_API_KEY", Some(""), is_prod)?,
                base_url: get_env(
                    "AVIATIONSTACK_BASE_URL",
                    Some("http://api.aviationstack.com/v1/flights"),
                    is_prod,
                )?,
            },
            warehouse: WarehouseSettings {
                base_url: get_env(
                    "WAREHOUSE_BASE_URL",
                    Some("https://bigquery.googleapis.com/bigquery/v2"),
                    is_prod,
                )?,
                project_id: get_env("GOOGLE_CLOUD_PROJECT", Some("dev-project"), is_prod)?,
                table: get_env("WAREHOUSE_TABLE", Some("flight_data.flights"), is_prod)?,
                access_token: get_env("WAREHOUSE_ACCESS_TOKEN", Some(""), is_prod)?,
            },
            timeouts: TimeoutSettings {
                llm_secs: get_env_u64("ASSISTANT_LLM_TIMEOUT_SECS", DEFAULT_LLM_TIMEOUT_SECS)?,
                status_secs: get_env_u64(
                    "ASSISTANT_STATUS_TIMEOUT_SECS",
                    DEFAULT_STATUS_TIMEOUT_SECS,
                )?,
                warehouse_secs: get_env_u64(
                    "ASSISTANT_WAREHOUSE_TIMEOUT_SECS",
                    DEFAULT_WAREHOUSE_TIMEOUT_SECS,
                )?,
            },
            rate_limit: RateLimitSettings {
                chat_per_minute: get_env_u64("ASSISTANT_CHAT_RATE_PER_MINUTE", 60)? as u32,
            },
        })
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn get_env_u64(key: &str, default: u64) -> Result<u64, AppError> {
    match env::var(key) {
        Ok(val) => val.parse().map_err(|_| {
            AppError::ConfigError(anyhow::anyhow!("{} must be an integer, got '{}'", key, val))
        }),
        Err(_) => Ok(default),
    }
}
