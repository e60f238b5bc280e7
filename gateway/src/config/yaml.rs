use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::ConfigError;

/// Complete YAML configuration structure
///
/// This structure represents the full configuration that can be loaded from a YAML file.
/// All fields are optional to allow partial configuration. Values given here win over
/// environment variables.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 3001
///   public_url: "https://bridge.example.com"
///   tls:
///     cert_path: "/etc/bridge/cert.pem"
///     key_path: "/etc/bridge/key.pem"
///
/// providers:
///   openai_api_key: "sk-..."
///
/// realtime:
///   url: "wss://api.openai.com/v1/realtime"
///   model: "gpt-4o-realtime-preview"
///   greeting_delay_ms: 300
///
/// booking:
///   webhook_url: "https://crm.example.com/bookings"
///   timeout_seconds: 10
///
/// default_tenant: acme
/// tenants:
///   acme:
///     display_name: "Acme Plumbing"
///     voice: coral
///     output_audio_format: g711_ulaw
///     barge_in: true
///   globex:
///     instructions: "You book HVAC repairs for Globex."
///     booking_webhook_url: "https://globex.example.com/hooks/booking"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub providers: Option<ProvidersYaml>,
    pub realtime: Option<RealtimeYaml>,
    pub booking: Option<BookingYaml>,
    pub default_tenant: Option<String>,
    pub tenants: BTreeMap<String, TenantYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub public_url: Option<String>,
    pub tls: Option<TlsYaml>,
}

/// TLS configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TlsYaml {
    pub cert_path: Option<PathBuf>,
    pub key_path: Option<PathBuf>,
}

/// Provider credentials from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ProvidersYaml {
    pub openai_api_key: Option<String>,
}

/// Realtime AI connection settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RealtimeYaml {
    pub url: Option<String>,
    pub model: Option<String>,
    pub greeting_delay_ms: Option<u64>,
}

/// Booking delivery settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct BookingYaml {
    pub webhook_url: Option<String>,
    pub timeout_seconds: Option<u64>,
}

/// One tenant entry. Unset fields inherit the environment-derived defaults.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TenantYaml {
    pub display_name: Option<String>,
    pub instructions: Option<String>,
    pub greeting_instructions: Option<String>,
    pub turn_instructions: Option<String>,
    pub voice: Option<String>,
    pub temperature: Option<f32>,
    pub output_audio_format: Option<String>,
    pub barge_in: Option<bool>,
    pub self_check_tone: Option<bool>,
    pub booking_webhook_url: Option<String>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;

        let config: YamlConfig = serde_yaml::from_str(&contents)?;
        Ok(config)
    }
}
