use std::sync::Arc;

use async_trait::async_trait;
use db::DBService;
use deployment::{Deployment, DeploymentError};
use services::services::{
    config::AppConfig,
    email::EmailService,
    telemetry::{Counter, MetricSink, metric_key, metric_sink},
};

#[derive(Clone)]
pub struct LocalDeployment {
    config: Arc<AppConfig>,
    db: DBService,
    metrics: Arc<dyn MetricSink>,
    user_counter: Counter,
    email: Option<EmailService>,
}

#[async_trait]
impl Deployment for LocalDeployment {
    async fn new(config: AppConfig) -> Result<Self, DeploymentError> {
        let db = DBService::new(&config.database_url).await?;

        let metrics = metric_sink(&config.metrics);
        let user_counter = metrics.counter(&metric_key("User"), "User route")?;

        let email = match config.email.clone() {
            Some(email_config) => Some(EmailService::new(email_config)?),
            None => {
                tracing::info!("EMAIL_API_KEY not set, email delivery disabled");
                None
            }
        };

        Ok(Self {
            config: Arc::new(config),
            db,
            metrics,
            user_counter,
            email,
        })
    }

    fn config(&self) -> &AppConfig {
        &self.config
    }

    fn db(&self) -> &DBService {
        &self.db
    }

    fn metrics(&self) -> &Arc<dyn MetricSink> {
        &self.metrics
    }

    fn user_counter(&self) -> &Counter {
        &self.user_counter
    }

    fn email(&self) -> &Option<EmailService> {
        &self.email
    }
}
