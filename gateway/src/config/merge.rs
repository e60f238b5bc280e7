use super::env::EnvConfig;
use super::tenant::{DEFAULT_TENANT_ID, TenantDirectory, TenantSettings};
use super::yaml::{TenantYaml, YamlConfig};
use super::{ConfigError, ServerConfig, TlsConfig};
use crate::core::delivery::DEFAULT_DELIVERY_TIMEOUT;
use crate::core::realtime::openai::{
    DEFAULT_REALTIME_MODEL, OPENAI_REALTIME_URL, OpenAIRealtimeAudioFormat, OpenAIRealtimeVoice,
};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3001;
const DEFAULT_GREETING_DELAY_MS: u64 = 300;

/// Merge YAML configuration with environment variables.
///
/// YAML values win, environment variables fill the gaps, then defaults.
/// Tenant entries inherit the environment-derived default tenant settings.
pub fn merge_config(yaml: Option<YamlConfig>) -> Result<ServerConfig, ConfigError> {
    let env = EnvConfig::load()?;
    let yaml = yaml.unwrap_or_default();

    let server = yaml.server.unwrap_or_default();
    let providers = yaml.providers.unwrap_or_default();
    let realtime = yaml.realtime.unwrap_or_default();
    let booking = yaml.booking.unwrap_or_default();

    let host = server
        .host
        .or(env.host.clone())
        .unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = server.port.or(env.port).unwrap_or(DEFAULT_PORT);
    let public_url = server.public_url.or(env.public_url.clone());

    let tls_yaml = server.tls.unwrap_or_default();
    let tls = match (
        tls_yaml.cert_path.or(env.tls_cert_path.clone()),
        tls_yaml.key_path.or(env.tls_key_path.clone()),
    ) {
        (Some(cert_path), Some(key_path)) => Some(TlsConfig {
            cert_path,
            key_path,
        }),
        (None, None) => None,
        _ => {
            return Err(ConfigError::invalid(
                "tls",
                "both cert_path and key_path must be set to enable TLS",
            ));
        }
    };

    let base_tenant = base_tenant(&env)?;
    let tenants = build_tenants(
        yaml.default_tenant.or(env.default_tenant.clone()),
        yaml.tenants,
        base_tenant,
    )?;

    Ok(ServerConfig {
        host,
        port,
        public_url,
        tls,
        openai_api_key: providers.openai_api_key.or(env.openai_api_key.clone()),
        realtime_url: realtime
            .url
            .or(env.realtime_url.clone())
            .unwrap_or_else(|| OPENAI_REALTIME_URL.to_string()),
        realtime_model: realtime
            .model
            .or(env.realtime_model.clone())
            .unwrap_or_else(|| DEFAULT_REALTIME_MODEL.to_string()),
        greeting_delay_ms: realtime
            .greeting_delay_ms
            .or(env.greeting_delay_ms)
            .unwrap_or(DEFAULT_GREETING_DELAY_MS),
        booking_webhook_url: booking.webhook_url.or(env.booking_webhook_url.clone()),
        booking_webhook_timeout_seconds: booking
            .timeout_seconds
            .or(env.booking_webhook_timeout_seconds)
            .unwrap_or(DEFAULT_DELIVERY_TIMEOUT.as_secs()),
        tenants,
    })
}

/// Tenant settings built from environment variables over the built-in defaults.
fn base_tenant(env: &EnvConfig) -> Result<TenantSettings, ConfigError> {
    let mut settings = TenantSettings::default();

    if let Some(instructions) = &env.instructions {
        settings.instructions = instructions.clone();
    }
    if let Some(greeting) = &env.greeting_instructions {
        settings.greeting_instructions = Some(greeting.clone());
    }
    if let Some(turn) = &env.turn_instructions {
        settings.turn_instructions = Some(turn.clone());
    }
    if let Some(voice) = &env.voice {
        settings.voice = parse_voice("VOICE", voice)?;
    }
    if let Some(temperature) = env.temperature {
        settings.temperature = temperature;
    }
    if let Some(format) = &env.output_audio_format {
        settings.output_audio_format = parse_format("AI_OUTPUT_FORMAT", format)?;
    }
    if let Some(barge_in) = env.barge_in {
        settings.barge_in = barge_in;
    }
    if let Some(tone) = env.self_check_tone {
        settings.self_check_tone = tone;
    }

    Ok(settings)
}

fn build_tenants(
    default_tenant: Option<String>,
    entries: impl IntoIterator<Item = (String, TenantYaml)>,
    base: TenantSettings,
) -> Result<TenantDirectory, ConfigError> {
    let tenants = entries
        .into_iter()
        .map(|(id, entry)| apply_tenant_yaml(&base, id, entry))
        .collect::<Result<Vec<_>, _>>()?;

    if tenants.is_empty() {
        let id = default_tenant.unwrap_or_else(|| DEFAULT_TENANT_ID.to_string());
        return Ok(TenantDirectory::single(TenantSettings { id, ..base }));
    }

    // A lone tenant is the default unless told otherwise.
    let default_tenant = match default_tenant {
        Some(id) => id,
        None if tenants.len() == 1 => tenants[0].id.clone(),
        None => DEFAULT_TENANT_ID.to_string(),
    };

    TenantDirectory::new(tenants, default_tenant)
}

fn apply_tenant_yaml(
    base: &TenantSettings,
    id: String,
    entry: TenantYaml,
) -> Result<TenantSettings, ConfigError> {
    let key = |field: &str| format!("tenants.{id}.{field}");

    let voice = match entry.voice {
        Some(voice) => parse_voice(&key("voice"), &voice)?,
        None => base.voice,
    };
    let output_audio_format = match entry.output_audio_format {
        Some(format) => parse_format(&key("output_audio_format"), &format)?,
        None => base.output_audio_format,
    };

    Ok(TenantSettings {
        display_name: entry.display_name.or(base.display_name.clone()),
        instructions: entry
            .instructions
            .unwrap_or_else(|| base.instructions.clone()),
        greeting_instructions: entry
            .greeting_instructions
            .or(base.greeting_instructions.clone()),
        turn_instructions: entry.turn_instructions.or(base.turn_instructions.clone()),
        voice,
        temperature: entry.temperature.unwrap_or(base.temperature),
        output_audio_format,
        barge_in: entry.barge_in.unwrap_or(base.barge_in),
        self_check_tone: entry.self_check_tone.unwrap_or(base.self_check_tone),
        booking_webhook_url: entry
            .booking_webhook_url
            .or(base.booking_webhook_url.clone()),
        id,
    })
}

fn parse_voice(key: &str, value: &str) -> Result<OpenAIRealtimeVoice, ConfigError> {
    OpenAIRealtimeVoice::parse(value).ok_or_else(|| {
        let known: Vec<&str> = OpenAIRealtimeVoice::all()
            .iter()
            .map(|voice| voice.as_str())
            .collect();
        ConfigError::invalid(
            key,
            format!("unknown voice '{value}' (expected one of {})", known.join(", ")),
        )
    })
}

fn parse_format(key: &str, value: &str) -> Result<OpenAIRealtimeAudioFormat, ConfigError> {
    OpenAIRealtimeAudioFormat::parse(value).ok_or_else(|| {
        ConfigError::invalid(
            key,
            format!("unknown audio format '{value}' (expected g711_ulaw or pcm16)"),
        )
    })
}
