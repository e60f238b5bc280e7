//! Call setup webhook.
//!
//! The telephony provider calls this when a call arrives. The reply is a
//! markup document telling it to open a media stream back to this gateway.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::info;

use crate::errors::{AppError, AppResult};
use crate::state::AppState;

const XML_CONTENT_TYPE: &str = "text/xml";

/// `POST /incoming-call` for the default tenant.
pub async fn incoming_call(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AppResult<Response> {
    connect_stream(&state, &headers, None)
}

/// `POST /incoming-call/{tenant}`.
pub async fn incoming_call_for_tenant(
    State(state): State<Arc<AppState>>,
    Path(tenant): Path<String>,
    headers: HeaderMap,
) -> AppResult<Response> {
    connect_stream(&state, &headers, Some(&tenant))
}

fn connect_stream(
    state: &AppState,
    headers: &HeaderMap,
    tenant: Option<&str>,
) -> AppResult<Response> {
    let settings = state
        .config
        .tenants
        .resolve(tenant)
        .ok_or_else(|| AppError::UnknownTenant(tenant.unwrap_or_default().to_string()))?;

    let base = stream_base_url(state.config.public_url.as_deref(), headers)?;
    let stream_url = format!("{base}/media-stream/{}", settings.id);

    info!(tenant = %settings.id, stream_url = %stream_url, "Incoming call");

    Ok((
        [(header::CONTENT_TYPE, XML_CONTENT_TYPE)],
        connect_markup(&stream_url),
    )
        .into_response())
}

/// WebSocket base URL (`wss://host[/prefix]`) the provider should stream to.
///
/// A configured public URL wins; its http scheme maps to ws and https to wss.
/// Otherwise the request's Host header is used with wss.
fn stream_base_url(public_url: Option<&str>, headers: &HeaderMap) -> AppResult<String> {
    if let Some(public_url) = public_url {
        let trimmed = public_url.trim_end_matches('/');
        let base = if let Some(rest) = trimmed.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = trimmed.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            format!("wss://{trimmed}")
        };
        return Ok(base);
    }

    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|host| !host.is_empty())
        .ok_or_else(|| AppError::BadRequest("missing Host header".to_string()))?;

    Ok(format!("wss://{host}"))
}

fn connect_markup(stream_url: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <Response><Connect><Stream url=\"{}\"/></Connect></Response>",
        xml_escape(stream_url)
    )
}

fn xml_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn host_headers(host: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_str(host).unwrap());
        headers
    }

    #[test]
    fn test_base_url_from_public_url() {
        let headers = host_headers("ignored.example.com");
        assert_eq!(
            stream_base_url(Some("https://bridge.example.com/"), &headers).unwrap(),
            "wss://bridge.example.com"
        );
        assert_eq!(
            stream_base_url(Some("http://localhost:3001"), &headers).unwrap(),
            "ws://localhost:3001"
        );
        assert_eq!(
            stream_base_url(Some("bridge.example.com"), &headers).unwrap(),
            "wss://bridge.example.com"
        );
    }

    #[test]
    fn test_base_url_from_host_header() {
        let headers = host_headers("abc123.ngrok.app");
        assert_eq!(
            stream_base_url(None, &headers).unwrap(),
            "wss://abc123.ngrok.app"
        );
        assert!(matches!(
            stream_base_url(None, &HeaderMap::new()),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_connect_markup() {
        let markup = connect_markup("wss://bridge.example.com/media-stream/acme");
        assert!(markup.contains(
            "<Response><Connect><Stream url=\"wss://bridge.example.com/media-stream/acme\"/></Connect></Response>"
        ));
        assert!(markup.starts_with("<?xml"));
    }

    #[test]
    fn test_xml_escape() {
        assert_eq!(xml_escape("a&b<c>\"'"), "a&amp;b&lt;c&gt;&quot;&apos;");
    }
}
