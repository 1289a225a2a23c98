//! # Controller Configuration
//!
//! Configuration loaded from environment variables (populated from a ConfigMap
//! via `envFrom` in the deployment).
//!
//! All configuration has sensible defaults and can be overridden via environment
//! variables. Command line flags in `main` take precedence over both.

mod controller;
mod server;

pub use controller::ControllerConfig;
pub use server::ServerConfig;

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Load configuration from environment variables with defaults
pub fn load_config() -> (ControllerConfig, ServerConfig) {
    (ControllerConfig::from_env(), ServerConfig::from_env())
}

/// Read environment variable or return default value
///
/// Unparseable values fall back to the default.
pub(crate) fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T
where
    <T as std::str::FromStr>::Err: std::fmt::Debug,
{
    parse_or_default(std::env::var(key).ok().as_deref(), default)
}

fn parse_or_default<T: std::str::FromStr>(value: Option<&str>, default: T) -> T {
    value
        .map(str::trim)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
