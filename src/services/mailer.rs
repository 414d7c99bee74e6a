use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("mail provider returned status {0}")]
    UpstreamStatus(reqwest::StatusCode),
}

#[derive(Debug, Deserialize)]
struct ProviderResponse {
    #[serde(default)]
    success: bool,
}

/// Outbound email via a configured HTTP mail provider. Delivery is
/// best-effort: callers get a bool, failures are logged, and nothing
/// here ever takes the process down.
#[derive(Clone)]
pub struct Mailer {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    from: String,
}

impl Mailer {
    pub fn from_config(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: config.mail_api_url.clone(),
            api_key: config.mail_api_key.clone(),
            from: config.mail_from.clone(),
        }
    }

    /// Send a plain-text email. Returns false on any failure
    /// (fail-silent-false); the error is logged for debugging.
    pub async fn send(&self, to: &str, subject: &str, body: &str) -> bool {
        match self.dispatch(to, subject, body).await {
            Ok(ok) => ok,
            Err(e) => {
                tracing::error!(error = %e, to, subject, "Failed to send email");
                false
            }
        }
    }

    async fn dispatch(&self, to: &str, subject: &str, body: &str) -> Result<bool, MailError> {
        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.from,
                "to": to,
                "subject": subject,
                "text": body,
            }))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(MailError::UpstreamStatus(resp.status()));
        }

        let parsed = resp.json::<ProviderResponse>().await?;
        Ok(parsed.success)
    }
}
