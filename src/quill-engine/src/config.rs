//! Engine configuration.
//!
//! All endpoint and timing knobs are injected at construction time; the
//! environment is only consulted when building the default configuration.

use std::time::Duration;

use url::Url;

use crate::error::{QuillError, Result};

/// Fallback API base address, the backend's default local bind.
const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Environment variable consulted by [`EngineConfig::default`].
const API_URL_ENV: &str = "QUILL_API_URL";

/// Timeout for receiving individual SSE chunks during streaming. If no
/// data arrives within this duration the session is failed rather than
/// blocking indefinitely on a stalled connection.
const DEFAULT_CHUNK_TIMEOUT: Duration = Duration::from_secs(60);

/// How long the last-edited-line highlight lingers after a session
/// completes successfully.
const DEFAULT_HIGHLIGHT_CLEAR_DELAY: Duration = Duration::from_millis(2000);

/// Configuration for the Quill engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// API base address, without a trailing slash.
    pub base_url: String,
    /// Per-chunk stall deadline for the streaming edit exchange.
    pub chunk_timeout: Duration,
    /// Delay before the line highlight auto-clears after success.
    pub highlight_clear_delay: Duration,
}

impl EngineConfig {
    /// Create a configuration with an explicit, validated base address.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();
        Url::parse(&base_url)
            .map_err(|e| QuillError::config(format!("Invalid base URL {base_url:?}: {e}")))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            chunk_timeout: DEFAULT_CHUNK_TIMEOUT,
            highlight_clear_delay: DEFAULT_HIGHLIGHT_CLEAR_DELAY,
        })
    }

    /// Set the per-chunk stall deadline.
    pub fn with_chunk_timeout(mut self, timeout: Duration) -> Self {
        self.chunk_timeout = timeout;
        self
    }

    /// Set the highlight auto-clear delay.
    pub fn with_highlight_clear_delay(mut self, delay: Duration) -> Self {
        self.highlight_clear_delay = delay;
        self
    }

    /// Build the URL for an API path, e.g. `/api/documents/`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        let base_url =
            std::env::var(API_URL_ENV).unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            chunk_timeout: DEFAULT_CHUNK_TIMEOUT,
            highlight_clear_delay: DEFAULT_HIGHLIGHT_CLEAR_DELAY,
        }
    }
}
