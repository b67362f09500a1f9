use std::sync::Arc;

use async_trait::async_trait;
use db::DBService;
use services::services::{
    config::AppConfig,
    email::{EmailError, EmailService, SendEmailPayload, SentEmail, send_email_task},
    telemetry::{Counter, MetricSink, TelemetryError},
};
use sqlx::Error as SqlxError;
use thiserror::Error;
use tokio::task::JoinHandle;

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error(transparent)]
    Sqlx(#[from] SqlxError),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Email(#[from] EmailError),
}

/// Process-wide capabilities shared by every request. Built once at startup
/// and cloned into the router state.
#[async_trait]
pub trait Deployment: Clone + Send + Sync + 'static {
    async fn new(config: AppConfig) -> Result<Self, DeploymentError>;

    fn config(&self) -> &AppConfig;

    fn db(&self) -> &DBService;

    fn metrics(&self) -> &Arc<dyn MetricSink>;

    /// Request counter for the `/user` route group.
    fn user_counter(&self) -> &Counter;

    fn email(&self) -> &Option<EmailService>;

    /// Runs the send-email job on the runtime without waiting for it.
    fn spawn_email_task(
        &self,
        payload: SendEmailPayload,
    ) -> Result<JoinHandle<Result<SentEmail, EmailError>>, EmailError> {
        let email = self.email().clone().ok_or(EmailError::NotConfigured)?;
        tracing::debug!(to = %payload.to, "Queueing email");
        Ok(tokio::spawn(async move {
            send_email_task(&email, payload).await
        }))
    }
}
