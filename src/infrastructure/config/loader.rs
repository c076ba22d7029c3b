//! Hierarchical process configuration: defaults -> YAML file -> environment
//! variables, layered with `figment`.

use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] figment::Error),
}

/// Process-level settings for running one town's HTTP edge + scheduler.
/// Distinct from [`crate::domain::models::TownConfig`], which is business
/// data (env vars handed to dispatched agents) stored in the town's own KV.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AppConfig {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub town_id: String,
    pub user_id: String,
    pub jwt_secret: String,
    pub container_runtime_url: String,
    pub registry_url: String,
    pub log_format: LogFormat,
    pub log_level: String,
    pub environment: Environment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// `ENVIRONMENT=development` disables auth middleware.
    pub fn auth_disabled(self) -> bool {
        matches!(self, Self::Development)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://gastown-town.db".to_string(),
            server_host: "0.0.0.0".to_string(),
            server_port: 8080,
            town_id: "default".to_string(),
            user_id: "default".to_string(),
            jwt_secret: "dev-secret-change-me".to_string(),
            container_runtime_url: "http://localhost:9090".to_string(),
            registry_url: "http://localhost:9091".to_string(),
            log_format: LogFormat::Pretty,
            log_level: "info".to_string(),
            environment: Environment::Development,
        }
    }
}

/// Loads config from (in ascending priority) built-in defaults, an optional
/// YAML file, then `GASTOWN_*` environment variables.
pub fn load(config_path: Option<&str>) -> Result<AppConfig, ConfigError> {
    let mut figment = Figment::new().merge(Serialized::defaults(AppConfig::default()));

    if let Some(path) = config_path {
        figment = figment.merge(Yaml::file(path));
    }

    figment = figment.merge(Env::prefixed("GASTOWN_").split("__"));

    Ok(figment.extract()?)
}
