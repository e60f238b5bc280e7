use url::Url;

use super::tenant::{TenantDirectory, TenantSettings};
use super::{ConfigError, ServerConfig, TlsConfig};
use crate::core::realtime::openai::{MAX_TEMPERATURE, MIN_TEMPERATURE};

/// Upper bound on the greeting settle delay, in milliseconds.
const MAX_GREETING_DELAY_MS: u64 = 10_000;

/// Run every check against a merged configuration.
pub fn validate_server_config(config: &ServerConfig) -> Result<(), ConfigError> {
    if let Some(tls) = &config.tls {
        validate_tls(tls)?;
    }
    if let Some(public_url) = &config.public_url {
        validate_url("server.public_url", public_url, &["http", "https"])?;
    }
    validate_url("realtime.url", &config.realtime_url, &["ws", "wss"])?;
    if config.realtime_model.trim().is_empty() {
        return Err(ConfigError::invalid("realtime.model", "must not be empty"));
    }
    if config.greeting_delay_ms > MAX_GREETING_DELAY_MS {
        return Err(ConfigError::invalid(
            "realtime.greeting_delay_ms",
            format!(
                "{} exceeds the maximum of {MAX_GREETING_DELAY_MS}",
                config.greeting_delay_ms
            ),
        ));
    }
    if let Some(webhook) = &config.booking_webhook_url {
        validate_url("booking.webhook_url", webhook, &["http", "https"])?;
    }
    if config.booking_webhook_timeout_seconds == 0 {
        return Err(ConfigError::invalid(
            "booking.timeout_seconds",
            "must be greater than zero",
        ));
    }
    validate_tenants(&config.tenants)
}

/// TLS files must exist before the listener tries to load them.
pub fn validate_tls(tls: &TlsConfig) -> Result<(), ConfigError> {
    if !tls.cert_path.exists() {
        return Err(ConfigError::invalid(
            "tls.cert_path",
            format!("file not found: {}", tls.cert_path.display()),
        ));
    }
    if !tls.key_path.exists() {
        return Err(ConfigError::invalid(
            "tls.key_path",
            format!("file not found: {}", tls.key_path.display()),
        ));
    }
    Ok(())
}

pub fn validate_tenants(tenants: &TenantDirectory) -> Result<(), ConfigError> {
    tenants.iter().try_for_each(validate_tenant)
}

fn validate_tenant(tenant: &TenantSettings) -> Result<(), ConfigError> {
    let key = |field: &str| format!("tenants.{}.{field}", tenant.id);

    if !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&tenant.temperature) {
        return Err(ConfigError::invalid(
            key("temperature"),
            format!(
                "{} is outside {MIN_TEMPERATURE}..={MAX_TEMPERATURE}",
                tenant.temperature
            ),
        ));
    }
    if tenant.instructions.trim().is_empty() {
        return Err(ConfigError::invalid(key("instructions"), "must not be empty"));
    }
    if let Some(webhook) = &tenant.booking_webhook_url {
        validate_url(&key("booking_webhook_url"), webhook, &["http", "https"])?;
    }
    Ok(())
}

fn validate_url(key: &str, value: &str, schemes: &[&str]) -> Result<(), ConfigError> {
    let url =
        Url::parse(value).map_err(|e| ConfigError::invalid(key, format!("'{value}': {e}")))?;

    if !schemes.contains(&url.scheme()) {
        return Err(ConfigError::invalid(
            key,
            format!("'{value}' must use one of: {}", schemes.join(", ")),
        ));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(ConfigError::invalid(key, format!("'{value}' has no host")));
    }
    Ok(())
}
