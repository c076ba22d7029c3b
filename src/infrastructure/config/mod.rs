pub mod loader;

pub use loader::{AppConfig, ConfigError, Environment, LogFormat};
