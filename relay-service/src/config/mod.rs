use secrecy::Secret;
use service_core::config::{self as core_config, get_env, get_env_parsed};
use service_core::error::AppError;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Gemini API base URL.
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Model used when `GEMINI_MODEL` is not set.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Origins accepted when `ALLOWED_ORIGINS` is not set.
pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[".dialogedu.com", "localhost:3000", "localhost:5173"];

const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 8192;
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;

/// Gemini accepts inline data up to 20MB per request.
const DEFAULT_MAX_REQUEST_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub gemini: GeminiSettings,
    pub generation: GenerationSettings,
    pub security: SecuritySettings,
    pub max_request_bytes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Test,
    Prod,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Dev),
            "test" => Ok(Environment::Test),
            "prod" | "production" => Ok(Environment::Prod),
            other => Err(format!("Unknown environment: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    /// Absent keys do not stop startup; requests fail with a 500 instead.
    pub api_key: Option<Secret<String>>,
    pub api_base_url: String,
    pub model: String,
    pub request_timeout: Duration,
}

/// Fixed generation parameters sent with every upstream call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationSettings {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SecuritySettings {
    /// Entries of the form `[.]host[:port]`.
    pub allowed_origins: Vec<String>,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            allowed_origins: DEFAULT_ALLOWED_ORIGINS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl RelayConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;

        let environment: Environment = env::var("ENVIRONMENT")
            .unwrap_or_else(|_| "dev".to_string())
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;
        let is_prod = environment == Environment::Prod;

        let api_key = env::var("GEMINI_API_KEY")
            .or_else(|_| env::var("GOOGLE_API_KEY"))
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .map(Secret::new);

        let allowed_origins: Vec<String> = get_env(
            "ALLOWED_ORIGINS",
            Some(&DEFAULT_ALLOWED_ORIGINS.join(",")),
            false,
        )?
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

        Ok(RelayConfig {
            common: common_config,
            environment,
            service_name: get_env("SERVICE_NAME", Some("relay-service"), false)?,
            log_level: get_env("LOG_LEVEL", Some("info"), false)?,
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            gemini: GeminiSettings {
                api_key,
                api_base_url: get_env("GEMINI_API_BASE", Some(DEFAULT_GEMINI_API_BASE), false)?,
                model: get_env("GEMINI_MODEL", Some(DEFAULT_GEMINI_MODEL), is_prod)?,
                request_timeout: Duration::from_secs(get_env_parsed(
                    "UPSTREAM_TIMEOUT_SECS",
                    DEFAULT_UPSTREAM_TIMEOUT_SECS,
                    false,
                )?),
            },
            generation: GenerationSettings {
                temperature: get_env_parsed("GENERATION_TEMPERATURE", DEFAULT_TEMPERATURE, false)?,
                max_output_tokens: get_env_parsed(
                    "GENERATION_MAX_OUTPUT_TOKENS",
                    DEFAULT_MAX_OUTPUT_TOKENS,
                    false,
                )?,
            },
            security: SecuritySettings { allowed_origins },
            max_request_bytes: get_env_parsed("MAX_REQUEST_BYTES", DEFAULT_MAX_REQUEST_BYTES, false)?,
        })
    }
}
