use std::sync::Arc;
use std::time::Duration;

use crate::config::{ServerConfig, TenantSettings};
use crate::core::delivery::{BookingSink, WebhookBookingSink};

/// Connect timeout for outbound HTTP requests.
const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Application state shared by every request and call.
pub struct AppState {
    pub config: ServerConfig,
    /// Shared client for booking webhooks; pools connections across calls.
    pub http_client: reqwest::Client,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Arc<Self> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            });

        Arc::new(Self {
            config,
            http_client,
        })
    }

    /// Where bookings recognized on a call of `tenant` are delivered, if anywhere.
    pub fn booking_sink_for(&self, tenant: &TenantSettings) -> Option<Arc<dyn BookingSink>> {
        self.config.booking_webhook_for(tenant).map(|url| {
            Arc::new(
                WebhookBookingSink::new(self.http_client.clone(), url)
                    .with_timeout(self.config.booking_webhook_timeout()),
            ) as Arc<dyn BookingSink>
        })
    }
}
