//! HTTP client factory.
//!
//! Factory functions for creating HTTP clients with consistent
//! configuration:
//! - `create_default_client()` - Standard 30s timeout for CRUD calls
//! - `create_streaming_client()` - 5min timeout for SSE streaming
//! - `create_client_with_timeout(duration)` - Custom timeout
//!
//! All clients include: User-Agent, tcp_nodelay, and a connect timeout.

use std::time::Duration;

use reqwest::{Client, Response};

use crate::error::{QuillError, Result};

/// User-Agent string for all HTTP requests.
pub const USER_AGENT: &str = concat!("quill/", env!("CARGO_PKG_VERSION"));

/// Default timeout for standard API requests (30 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Extended timeout for streaming edit requests (5 minutes).
pub const STREAMING_TIMEOUT: Duration = Duration::from_secs(300);

/// Short timeout for health checks (5 seconds).
pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Default connection timeout (10 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection pool idle timeout so DNS is re-resolved periodically.
pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Creates an HTTP client with default configuration (30s timeout).
pub fn create_default_client() -> Result<Client> {
    create_client_with_timeout(DEFAULT_TIMEOUT)
}

/// Creates an HTTP client for streaming endpoints (5min timeout).
///
/// Use this for endpoints that stream responses (SSE, chunked transfer).
pub fn create_streaming_client() -> Result<Client> {
    create_client_with_timeout(STREAMING_TIMEOUT)
}

/// Creates an HTTP client with a custom timeout.
pub fn create_client_with_timeout(timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .tcp_nodelay(true)
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
        .timeout(timeout)
        .pool_idle_timeout(POOL_IDLE_TIMEOUT)
        .build()
        .map_err(|e| QuillError::internal(format!("Failed to build HTTP client: {e}")))
}

/// Extract a human-readable error message from a non-success response.
///
/// The backend reports failures as JSON (`{"detail": ...}`, FastAPI style,
/// or `{"error": {"message": ...}}`); fall back to a body preview.
pub(crate) async fn extract_error_message(resp: Response) -> String {
    let status = resp.status();
    let is_json = resp
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.contains("application/json"))
        .unwrap_or(false);

    let body = resp.text().await.unwrap_or_default();

    if is_json {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(&body) {
            if let Some(detail) = value.get("detail").and_then(|d| d.as_str()) {
                return format!("HTTP {status}: {detail}");
            }
            if let Some(message) = value
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
            {
                return format!("HTTP {status}: {message}");
            }
        }
    }

    let body_preview = if body.len() > 200 {
        format!("{}...", &body[..200])
    } else {
        body
    };
    format!("HTTP {status}: {body_preview}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_has_version() {
        assert!(USER_AGENT.starts_with("quill/"));
        assert!(USER_AGENT.len() > "quill/".len());
    }

    #[test]
    fn test_create_clients() {
        assert!(create_default_client().is_ok());
        assert!(create_streaming_client().is_ok());
        assert!(create_client_with_timeout(Duration::from_secs(1)).is_ok());
    }
}
