use crate::error::AppError;
use config::{Config as Cfg, File};
use serde::Deserialize;
use std::env;

/// Server settings shared by every service.
///
/// Loaded from an optional `configuration` file and `APP__*` environment
/// variables (e.g. `APP__PORT=9000`).
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let config = Cfg::builder()
            .add_source(File::with_name("configuration").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Socket address string suitable for `TcpListener::bind`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Read an environment variable.
///
/// In production every key must be set explicitly; elsewhere `default` is
/// used when the variable is missing.
pub fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
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

/// Read and parse an environment variable, falling back to `default`.
pub fn get_env_parsed<T>(key: &str, default: T, is_prod: bool) -> Result<T, AppError>
where
    T: std::str::FromStr + ToString,
    T::Err: std::fmt::Display,
{
    get_env(key, Some(&default.to_string()), is_prod)?
        .trim()
        .parse()
        .map_err(|e: T::Err| AppError::ConfigError(anyhow::anyhow!("Invalid {}: {}", key, e)))
}
