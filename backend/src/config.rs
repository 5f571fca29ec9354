//! Configuration management for the PoultryMitra backend
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (config/development.toml, config/production.toml)
//! 3. Environment variable overrides with PM__ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Identity token verification
    pub jwt: JwtConfig,

    /// AI assistant service
    pub ai: AiConfig,

    /// Back-office settings
    pub admin: AdminConfig,

    /// Log output
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Shared secret the auth provider signs identity tokens with
    pub secret: String,

    /// Expected `iss` claim, if the provider sets one
    pub issuer: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AiConfig {
    /// Model service endpoint; the local rules are used when unset
    pub endpoint: Option<String>,

    /// API key for the model service
    pub api_key: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Substitute local answers when the service fails
    pub fallback_enabled: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AdminConfig {
    /// Emails that become active administrators on signup
    pub auto_admin_emails: Vec<String>,
}

impl AdminConfig {
    pub fn is_auto_admin(&self, email: &str) -> bool {
        self.auto_admin_emails
            .iter()
            .any(|e| e.eq_ignore_ascii_case(email))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    /// "pretty" or "json"
    pub format: String,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("PM_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("ai.timeout_secs", 20)?
            .set_default("ai.fallback_enabled", true)?
            .set_default("admin.auto_admin_emails", Vec::<String>::new())?
            .set_default("log.format", "pretty")?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (PM_ prefix)
            .add_source(
                Environment::with_prefix("PM")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("admin.auto_admin_emails")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
