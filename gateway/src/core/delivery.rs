//! Booking delivery to the downstream automation endpoint.
//!
//! Delivery is fire-and-forget from the call's point of view: the bridge hands
//! a record to [`dispatch_booking`] and moves on. The outcome is only logged.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::core::booking::BookingRecord;

/// Default timeout for a single delivery attempt.
pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Booking delivery request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Booking endpoint {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
}

/// Identifies the call a record came from. Sent alongside the record.
#[derive(Debug, Clone, Default)]
pub struct DeliveryContext {
    pub call_id: String,
    pub call_sid: Option<String>,
    pub tenant: String,
}

/// Destination for recognized bookings.
#[async_trait]
pub trait BookingSink: Send + Sync {
    async fn deliver(
        &self,
        record: &BookingRecord,
        context: &DeliveryContext,
    ) -> Result<(), DeliveryError>;

    /// Human readable destination, for logs.
    fn destination(&self) -> &str;
}

/// POSTs each record as JSON to a webhook URL.
pub struct WebhookBookingSink {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl WebhookBookingSink {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            timeout: DEFAULT_DELIVERY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl BookingSink for WebhookBookingSink {
    async fn deliver(
        &self,
        record: &BookingRecord,
        context: &DeliveryContext,
    ) -> Result<(), DeliveryError> {
        let mut request = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .header("X-Call-ID", &context.call_id)
            .header("X-Tenant", &context.tenant)
            .json(record);

        if let Some(call_sid) = &context.call_sid {
            request = request.header("X-Call-Sid", call_sid);
        }

        let response = request.send().await.map_err(|source| DeliveryError::Request {
            url: self.url.clone(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        Ok(())
    }

    fn destination(&self) -> &str {
        &self.url
    }
}

/// Deliver `record` on a detached task. Failures are logged and never retried.
pub fn dispatch_booking(
    sink: Arc<dyn BookingSink>,
    record: BookingRecord,
    context: DeliveryContext,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match sink.deliver(&record, &context).await {
            Ok(()) => info!(
                call_id = %context.call_id,
                destination = %sink.destination(),
                name = %record.name,
                start = %record.start,
                "Booking delivered"
            ),
            Err(e) => warn!(
                call_id = %context.call_id,
                destination = %sink.destination(),
                error = %e,
                "Booking delivery failed"
            ),
        }
    })
}
