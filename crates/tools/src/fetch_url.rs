//! Fetch a URL over HTTP/HTTPS, GET only, with size and time bounds.

use std::sync::Arc;

use async_trait::async_trait;

use engram_core::error::ToolError;
use engram_core::tool::{Tool, ToolResult};
use engram_security::{AuditEvent, AuditOutcome};

use crate::ToolEnv;

/// Cap on a fetched response body.
const FETCH_SIZE_MAX: usize = 10 * 1024 * 1024;

/// Wall-clock bound on the whole request, independent of bytes received.
const FETCH_TIMEOUT_SECS: u64 = 30;

const REDIRECTS_MAX: usize = 5;

pub struct FetchUrlTool {
    env: Arc<ToolEnv>,
    client: reqwest::Client,
}

impl FetchUrlTool {
    pub fn new(env: Arc<ToolEnv>) -> Self {
        // Redirects are followed only within http/https.
        let policy = reqwest::redirect::Policy::custom(|attempt| {
            if attempt.previous().len() > REDIRECTS_MAX {
                attempt.error("too many redirects")
            } else if !matches!(attempt.url().scheme(), "http" | "https") {
                attempt.error("redirect off http/https")
            } else {
                attempt.follow()
            }
        });

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(FETCH_TIMEOUT_SECS))
            .redirect(policy)
            .user_agent("engram-agent/0.3")
            .build()
            .expect("HTTP client construction is infallible with static options");

        Self { env, client }
    }
}

#[async_trait]
impl Tool for FetchUrlTool {
    fn name(&self) -> &str {
        "fetch_url"
    }

    fn description(&self) -> &str {
        "Fetch the body of an http:// or https:// URL with a GET request."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "The URL to fetch (http or https)"
                }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let url = arguments["url"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'url' argument".into()))?;

        if !url.starts_with("http://") && !url.starts_with("https://") {
            self.env.audit.log(
                AuditEvent::UrlDenied { url: url.into() },
                &self.env.agent_name,
                AuditOutcome::Denied,
                None,
                Some("scheme not http/https".into()),
            );
            return Err(ToolError::InvalidArguments(format!(
                "only http:// and https:// URLs are allowed, got: {}",
                url.chars().take(50).collect::<String>()
            )));
        }

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return Ok(ToolResult::error(format!(
                    "fetch timed out after {FETCH_TIMEOUT_SECS}s: {url}"
                )))
            }
            Err(e) => return Ok(ToolResult::error(format!("fetch failed: {e}"))),
        };

        let status = response.status();
        if !status.is_success() {
            return Ok(ToolResult::error(format!(
                "HTTP {} for {url}",
                status.as_u16()
            )));
        }

        if let Some(length) = response.content_length() {
            if length > FETCH_SIZE_MAX as u64 {
                return Ok(ToolResult::error(format!(
                    "response too large: {length} bytes (max {FETCH_SIZE_MAX})"
                )));
            }
        }

        // Stream with a hard cap; Content-Length can lie or be absent.
        let mut body: Vec<u8> = Vec::new();
        let mut response = response;
        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    if body.len() + chunk.len() > FETCH_SIZE_MAX {
                        return Ok(ToolResult::error(format!(
                            "response exceeds {FETCH_SIZE_MAX} bytes"
                        )));
                    }
                    body.extend_from_slice(&chunk);
                }
                Ok(None) => break,
                Err(e) if e.is_timeout() => {
                    return Ok(ToolResult::error(format!(
                        "fetch timed out after {FETCH_TIMEOUT_SECS}s: {url}"
                    )))
                }
                Err(e) => return Ok(ToolResult::error(format!("fetch failed mid-body: {e}"))),
            }
        }

        Ok(ToolResult::ok(
            String::from_utf8_lossy(&body).into_owned(),
        ))
    }
}
