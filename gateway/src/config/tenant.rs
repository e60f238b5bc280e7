//! Per-tenant call settings.
//!
//! Each call resolves one immutable [`TenantSettings`] at accept time through
//! the [`TenantDirectory`]. Nothing on the call path mutates it.

use std::collections::HashMap;
use std::sync::Arc;

use super::ConfigError;
use crate::core::realtime::openai::{
    Modality, OpenAIRealtimeAudioFormat, OpenAIRealtimeVoice, SessionConfig, TurnDetection,
};

/// Tenant id used when nothing else is configured.
pub const DEFAULT_TENANT_ID: &str = "default";

pub const DEFAULT_TEMPERATURE: f32 = 0.8;

pub const DEFAULT_INSTRUCTIONS: &str = "You are the phone receptionist for a home services company. \
Greet callers warmly, keep every reply short and conversational, and collect the details needed to \
book a technician visit: the caller's full name, a callback phone number, the service address, a short \
description of the job, a preferred start and end time, any extra notes, and whether it is an emergency. \
Confirm the details back to the caller. Once they confirm, end that reply with the marker BOOKING: \
followed immediately by a single JSON object with the keys name, phone, address, job, start, end, notes \
and emergency. Use RFC 3339 timestamps with a UTC offset for start and end, a string for notes and a \
boolean for emergency. Emit the marker exactly once per call and never read it aloud.";

pub const DEFAULT_GREETING_INSTRUCTIONS: &str =
    "Greet the caller, introduce yourself as the booking assistant and ask how you can help.";

/// Immutable settings for every call of one tenant.
#[derive(Debug, Clone, PartialEq)]
pub struct TenantSettings {
    pub id: String,
    pub display_name: Option<String>,
    /// Session prompt sent with `session.update`.
    pub instructions: String,
    /// Instructions for the opening response. `None` lets the prompt decide.
    pub greeting_instructions: Option<String>,
    /// Instructions attached to each caller-triggered response.
    pub turn_instructions: Option<String>,
    pub voice: OpenAIRealtimeVoice,
    pub temperature: f32,
    /// Audio format requested from the AI. Caller audio is always u-law.
    pub output_audio_format: OpenAIRealtimeAudioFormat,
    /// Clear buffered playback when the caller starts talking.
    pub barge_in: bool,
    /// Play a short tone when the media stream starts.
    pub self_check_tone: bool,
    /// Overrides the global booking webhook for this tenant.
    pub booking_webhook_url: Option<String>,
}

impl Default for TenantSettings {
    fn default() -> Self {
        Self {
            id: DEFAULT_TENANT_ID.to_string(),
            display_name: None,
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            greeting_instructions: Some(DEFAULT_GREETING_INSTRUCTIONS.to_string()),
            turn_instructions: None,
            voice: OpenAIRealtimeVoice::default(),
            temperature: DEFAULT_TEMPERATURE,
            output_audio_format: OpenAIRealtimeAudioFormat::default(),
            barge_in: true,
            self_check_tone: false,
            booking_webhook_url: None,
        }
    }
}

impl TenantSettings {
    /// The `session.update` payload for this tenant.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            modalities: Some(vec![Modality::Text, Modality::Audio]),
            instructions: Some(self.instructions.clone()),
            voice: Some(self.voice),
            input_audio_format: Some(OpenAIRealtimeAudioFormat::G711Ulaw),
            output_audio_format: Some(self.output_audio_format),
            turn_detection: Some(TurnDetection::server_vad_manual_response()),
            temperature: Some(self.temperature),
        }
    }
}

/// Lookup of tenant settings by short id.
#[derive(Debug, Clone)]
pub struct TenantDirectory {
    tenants: HashMap<String, Arc<TenantSettings>>,
    default_tenant: String,
}

impl TenantDirectory {
    /// Build a directory. `default_tenant` must name one of `tenants`.
    pub fn new(
        tenants: impl IntoIterator<Item = TenantSettings>,
        default_tenant: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let default_tenant = default_tenant.into();
        let mut map = HashMap::new();
        for tenant in tenants {
            if tenant.id.trim().is_empty() {
                return Err(ConfigError::invalid("tenants", "tenant id must not be empty"));
            }
            map.insert(tenant.id.clone(), Arc::new(tenant));
        }

        if !map.contains_key(&default_tenant) {
            return Err(ConfigError::UnknownDefaultTenant(default_tenant));
        }

        Ok(Self {
            tenants: map,
            default_tenant,
        })
    }

    /// A directory holding one tenant, which is also the default.
    pub fn single(settings: TenantSettings) -> Self {
        let default_tenant = settings.id.clone();
        let mut tenants = HashMap::new();
        tenants.insert(default_tenant.clone(), Arc::new(settings));
        Self {
            tenants,
            default_tenant,
        }
    }

    /// Resolve a tenant. `None` means the default tenant.
    pub fn resolve(&self, id: Option<&str>) -> Option<Arc<TenantSettings>> {
        let id = id.map(str::trim).filter(|id| !id.is_empty());
        self.tenants
            .get(id.unwrap_or(&self.default_tenant))
            .cloned()
    }

    pub fn default_tenant_id(&self) -> &str {
        &self.default_tenant
    }

    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TenantSettings> {
        self.tenants.values().map(|tenant| tenant.as_ref())
    }
}

impl Default for TenantDirectory {
    fn default() -> Self {
        Self::single(TenantSettings::default())
    }
}
