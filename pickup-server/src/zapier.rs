//! Zapier catch-hook forwarding

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ZapierError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Zapier hook returned {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Clone)]
pub struct ZapierClient {
    http: reqwest::Client,
    hook_url: String,
}

impl ZapierClient {
    pub fn new(http: reqwest::Client, hook_url: impl Into<String>) -> Self {
        Self {
            http,
            hook_url: hook_url.into(),
        }
    }

    /// POST a JSON payload to the catch hook
    pub async fn forward(&self, payload: &Value) -> Result<(), ZapierError> {
        let response = self.http.post(&self.hook_url).json(payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ZapierError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        tracing::debug!(status = status.as_u16(), "Forwarded payload to Zapier");
        Ok(())
    }
}
