//! Shared HTTP plumbing for the service clients.

use std::time::Duration;

use docex_core::error::{DocexError, DocexResult};
use reqwest::{Client, Response};
use url::Url;

/// Normalize a service base URL: must be http(s), no trailing slash.
pub(crate) fn base_url(raw: &str) -> DocexResult<String> {
    let url = Url::parse(raw.trim())
        .map_err(|e| DocexError::Configuration(format!("Invalid service URL '{}': {}", raw, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(DocexError::Configuration(format!(
            "Service URL must use http or https, got '{}'",
            url.scheme()
        )));
    }
    Ok(url.as_str().trim_end_matches('/').to_string())
}

/// Build a client. `None` leaves requests without a timeout.
pub(crate) fn client(timeout: Option<Duration>) -> DocexResult<Client> {
    let mut builder = Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| DocexError::Configuration(format!("Failed to build HTTP client: {}", e)))
}

/// Optional timeout from a `*_TIMEOUT_SECS` variable.
pub(crate) fn env_timeout(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Map a transport failure. Only these count as connectivity errors.
pub(crate) fn transport_error(service: &str, e: reqwest::Error) -> DocexError {
    if e.is_timeout() {
        DocexError::timeout(format!("{} timed out: {}", service, e))
    } else {
        DocexError::Network {
            message: format!("{} unreachable: {}", service, e),
            code: docex_core::ErrorCode::NetConnectionFailed,
            source: Some(Box::new(e)),
        }
    }
}

/// Pass successful responses through; turn the rest into errors.
///
/// Client errors and gateway timeouts map through
/// [`DocexError::from_http_status`]; anything else is a failure of the
/// service itself, built by `service_error`.
pub(crate) async fn check_status(
    response: Response,
    service: &str,
    service_error: fn(String) -> DocexError,
) -> DocexResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    match status.as_u16() {
        code @ (400 | 408 | 422 | 504) => Err(DocexError::from_http_status(code, &body)),
        code => Err(service_error(format!(
            "{} returned HTTP {}: {}",
            service, code, body
        ))),
    }
}
