use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use super::ConfigError;

/// Every environment variable the gateway reads.
pub const ENV_VARS: &[&str] = &[
    "HOST",
    "PORT",
    "PUBLIC_URL",
    "TLS_CERT_PATH",
    "TLS_KEY_PATH",
    "OPENAI_API_KEY",
    "OPENAI_REALTIME_URL",
    "OPENAI_REALTIME_MODEL",
    "GREETING_DELAY_MS",
    "BOOKING_WEBHOOK_URL",
    "BOOKING_WEBHOOK_TIMEOUT_SECONDS",
    "DEFAULT_TENANT",
    "SYSTEM_INSTRUCTIONS",
    "GREETING_INSTRUCTIONS",
    "TURN_INSTRUCTIONS",
    "VOICE",
    "TEMPERATURE",
    "AI_OUTPUT_FORMAT",
    "BARGE_IN",
    "SELF_CHECK_TONE",
];

/// Configuration read from environment variables. `None` means unset.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub public_url: Option<String>,
    pub tls_cert_path: Option<PathBuf>,
    pub tls_key_path: Option<PathBuf>,

    pub openai_api_key: Option<String>,
    pub realtime_url: Option<String>,
    pub realtime_model: Option<String>,
    pub greeting_delay_ms: Option<u64>,

    pub booking_webhook_url: Option<String>,
    pub booking_webhook_timeout_seconds: Option<u64>,

    // Default tenant settings
    pub default_tenant: Option<String>,
    pub instructions: Option<String>,
    pub greeting_instructions: Option<String>,
    pub turn_instructions: Option<String>,
    pub voice: Option<String>,
    pub temperature: Option<f32>,
    pub output_audio_format: Option<String>,
    pub barge_in: Option<bool>,
    pub self_check_tone: Option<bool>,
}

impl EnvConfig {
    /// Read all supported variables from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Ok(Self {
            host: var("HOST"),
            port: parse_var("PORT")?,
            public_url: var("PUBLIC_URL"),
            tls_cert_path: var("TLS_CERT_PATH").map(PathBuf::from),
            tls_key_path: var("TLS_KEY_PATH").map(PathBuf::from),

            openai_api_key: var("OPENAI_API_KEY"),
            realtime_url: var("OPENAI_REALTIME_URL"),
            realtime_model: var("OPENAI_REALTIME_MODEL"),
            greeting_delay_ms: parse_var("GREETING_DELAY_MS")?,

            booking_webhook_url: var("BOOKING_WEBHOOK_URL"),
            booking_webhook_timeout_seconds: parse_var("BOOKING_WEBHOOK_TIMEOUT_SECONDS")?,

            default_tenant: var("DEFAULT_TENANT"),
            instructions: var("SYSTEM_INSTRUCTIONS"),
            greeting_instructions: var("GREETING_INSTRUCTIONS"),
            turn_instructions: var("TURN_INSTRUCTIONS"),
            voice: var("VOICE"),
            temperature: parse_var("TEMPERATURE")?,
            output_audio_format: var("AI_OUTPUT_FORMAT"),
            barge_in: bool_var("BARGE_IN")?,
            self_check_tone: bool_var("SELF_CHECK_TONE")?,
        })
    }
}

/// A trimmed, non-empty variable.
fn var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_var<T>(name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    var(name)
        .map(|value| {
            value
                .parse::<T>()
                .map_err(|e| ConfigError::invalid(name, format!("'{value}': {e}")))
        })
        .transpose()
}

fn bool_var(name: &str) -> Result<Option<bool>, ConfigError> {
    var(name)
        .map(|value| match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::invalid(
                name,
                format!("'{value}' is not a boolean"),
            )),
        })
        .transpose()
}
