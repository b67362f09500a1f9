use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use ts_rs::TS;

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Email delivery is not configured")]
    NotConfigured,
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("Email API rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("Email was not sent within {0:?}")]
    Timeout(Duration),
}

impl EmailError {
    /// Transport failures, throttling and 5xx responses are worth retrying.
    fn is_retryable(&self) -> bool {
        match self {
            EmailError::Http(_) => true,
            EmailError::Rejected { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS.as_u16() || *status >= 500
            }
            EmailError::NotConfigured | EmailError::Timeout(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailConfig {
    pub api_key: String,
    /// Base URL of a Resend-compatible API; messages are posted to `/emails`.
    pub api_url: String,
    pub from: String,
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub min_delay: Duration,
    pub max_delay: Duration,
    /// Upper bound for the whole task, retries included.
    pub max_duration: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            max_duration: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SendEmailPayload {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub html: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SentEmail {
    pub success: bool,
    pub sent_at: DateTime<Utc>,
    pub to: String,
    pub email_id: String,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    id: String,
}

#[derive(Clone, Debug)]
pub struct EmailService {
    config: EmailConfig,
    retry: RetryPolicy,
    client: reqwest::Client,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Result<Self, EmailError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            config,
            retry: RetryPolicy::default(),
            client,
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sends one message and returns the provider's message id.
    pub async fn send(&self, payload: &SendEmailPayload) -> Result<String, EmailError> {
        let endpoint = format!("{}/emails", self.config.api_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&json!({
                "from": self.config.from,
                "to": [payload.to],
                "subject": payload.subject,
                "text": payload.body,
                "html": payload.html,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let sent: SendResponse = response.json().await?;
        Ok(sent.id)
    }
}

/// Background job body: sends `payload`, retrying transient failures within
/// the service's [`RetryPolicy`].
pub async fn send_email_task(
    service: &EmailService,
    payload: SendEmailPayload,
) -> Result<SentEmail, EmailError> {
    tracing::info!(to = %payload.to, subject = %payload.subject, "Sending email");

    let policy = service.retry;
    let backoff = ExponentialBuilder::default()
        .with_min_delay(policy.min_delay)
        .with_max_delay(policy.max_delay)
        .with_max_times(policy.max_attempts.saturating_sub(1))
        .with_jitter();

    let attempt = (|| async { service.send(&payload).await })
        .retry(backoff)
        .when(EmailError::is_retryable)
        .notify(|err: &EmailError, dur: Duration| {
            tracing::warn!(
                "Email API call failed, retrying after {:.2}s: {}",
                dur.as_secs_f64(),
                err
            );
        });

    let result = match tokio::time::timeout(policy.max_duration, attempt).await {
        Ok(result) => result,
        Err(_) => Err(EmailError::Timeout(policy.max_duration)),
    };

    match result {
        Ok(email_id) => {
            tracing::info!(to = %payload.to, email_id = %email_id, "Email sent successfully");
            Ok(SentEmail {
                success: true,
                sent_at: Utc::now(),
                to: payload.to,
                email_id,
            })
        }
        Err(e) => {
            tracing::error!(to = %payload.to, error = %e, "Failed to send email");
            Err(e)
        }
    }
}
