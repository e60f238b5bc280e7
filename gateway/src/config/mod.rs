//! Configuration module for the call bridge gateway
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//! The configuration is split into logical submodules:
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//! - `tenant`: Per-tenant call settings and the tenant directory
//!
//! # Example
//! ```rust,no_run
//! use callbridge_gateway::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

mod env;
mod merge;
mod tenant;
mod validation;
mod yaml;

pub use tenant::{
    DEFAULT_GREETING_INSTRUCTIONS, DEFAULT_INSTRUCTIONS, DEFAULT_TEMPERATURE, DEFAULT_TENANT_ID,
    TenantDirectory, TenantSettings,
};

use crate::core::realtime::RealtimeConfig;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Default tenant '{0}' is not defined")]
    UnknownDefaultTenant(String),

    #[error("OpenAI API key is not configured (set OPENAI_API_KEY or providers.openai_api_key)")]
    MissingApiKey,
}

impl ConfigError {
    pub(crate) fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// TLS configuration for HTTPS and WSS
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Server configuration
///
/// Contains everything needed to run the gateway:
/// - Server settings (host, port, public URL, TLS)
/// - Realtime AI connection settings
/// - Booking delivery settings
/// - The tenant directory
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,
    /// Public base URL the telephony provider reaches us on (e.g. `https://bridge.example.com`).
    /// When unset the call setup webhook falls back to the request's Host header.
    pub public_url: Option<String>,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    // Realtime AI settings
    pub openai_api_key: Option<String>,
    pub realtime_url: String,
    pub realtime_model: String,
    /// Settle time between AI readiness and the greeting request, in milliseconds
    pub greeting_delay_ms: u64,

    // Booking delivery
    pub booking_webhook_url: Option<String>,
    pub booking_webhook_timeout_seconds: u64,

    pub tenants: TenantDirectory,
}

/// Zeroize secret fields when the configuration is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut key) = self.openai_api_key {
            key.zeroize();
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables (and defaults) only.
    ///
    /// `.env` is loaded into the environment by `main` before this runs.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = merge::merge_config(None)?;
        validation::validate_server_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// After loading and merging, performs validation on the final configuration.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let config = merge::merge_config(Some(yaml_config))?;
        validation::validate_server_config(&config)?;
        Ok(config)
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if TLS is enabled
    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    pub fn greeting_delay(&self) -> Duration {
        Duration::from_millis(self.greeting_delay_ms)
    }

    pub fn booking_webhook_timeout(&self) -> Duration {
        Duration::from_secs(self.booking_webhook_timeout_seconds)
    }

    /// Booking destination for a tenant: the tenant override, else the global webhook.
    pub fn booking_webhook_for<'a>(&'a self, tenant: &'a TenantSettings) -> Option<&'a str> {
        tenant
            .booking_webhook_url
            .as_deref()
            .or(self.booking_webhook_url.as_deref())
    }

    /// Connection settings for a new realtime session.
    pub fn realtime_config(&self) -> Result<RealtimeConfig, ConfigError> {
        let api_key = self
            .openai_api_key
            .as_ref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        Ok(RealtimeConfig {
            api_key: api_key.clone(),
            url: self.realtime_url.clone(),
            model: self.realtime_model.clone(),
        })
    }
}
