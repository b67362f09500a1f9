use std::env;

use strum_macros::{Display, EnumString};
use thiserror::Error;

use crate::services::email::EmailConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AppEnv {
    #[default]
    Development,
    Production,
    Test,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub exporter_port: u16,
}

/// OTLP trace export. Spans are only exported when `enabled` and an OTLP
/// HTTP port are both set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TracingConfig {
    pub enabled: bool,
    pub tempo_url: Option<String>,
    pub otlp_http_port: Option<u16>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app_name: String,
    pub app_env: AppEnv,
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub log_level: String,
    pub metrics: MetricsConfig,
    pub tracing: TracingConfig,
    /// `None` when no email API key is configured; email routes then refuse
    /// to enqueue.
    pub email: Option<EmailConfig>,
}

pub const DEFAULT_APP_NAME: &str = "backend-kit";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_METRICS_EXPORTER_PORT: u16 = 9464;
pub const DEFAULT_DATABASE_URL: &str = "sqlite://backend-kit.sqlite";
pub const DEFAULT_EMAIL_API_URL: &str = "https://api.resend.com";
pub const DEFAULT_EMAIL_FROM: &str = "onboarding@resend.dev";

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Empty values count as
    /// unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let app_env = match get("APP_ENV") {
            Some(raw) => raw.parse::<AppEnv>().map_err(|e| ConfigError::Invalid {
                key: "APP_ENV",
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => AppEnv::default(),
        };

        let port = match (get("PORT"), get("APP_PORT")) {
            (Some(raw), _) => parse_port("PORT", &raw)?,
            (None, Some(raw)) => parse_port("APP_PORT", &raw)?,
            (None, None) => DEFAULT_PORT,
        };

        let metrics = MetricsConfig {
            enabled: match get("METRICS_ENABLED") {
                Some(raw) => parse_bool("METRICS_ENABLED", &raw)?,
                None => false,
            },
            exporter_port: match get("METRICS_EXPORTER_PORT") {
                Some(raw) => parse_port("METRICS_EXPORTER_PORT", &raw)?,
                None => DEFAULT_METRICS_EXPORTER_PORT,
            },
        };

        let tracing_config = TracingConfig {
            enabled: match get("TRACING_ENABLED") {
                Some(raw) => parse_bool("TRACING_ENABLED", &raw)?,
                None => false,
            },
            tempo_url: get("TEMPO_URL"),
            otlp_http_port: get("TEMPO_OTLP_HTTP_PORT")
                .map(|raw| parse_port("TEMPO_OTLP_HTTP_PORT", &raw))
                .transpose()?,
        };

        let email = get("EMAIL_API_KEY").map(|api_key| EmailConfig {
            api_key,
            api_url: get("EMAIL_API_URL").unwrap_or_else(|| DEFAULT_EMAIL_API_URL.to_string()),
            from: get("EMAIL_FROM").unwrap_or_else(|| DEFAULT_EMAIL_FROM.to_string()),
        });

        Ok(Self {
            app_name: get("APP_NAME").unwrap_or_else(|| DEFAULT_APP_NAME.to_string()),
            app_env,
            host: get("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            log_level: get("LOG_LEVEL")
                .or_else(|| get("RUST_LOG"))
                .unwrap_or_else(|| "info".to_string()),
            metrics,
            tracing: tracing_config,
            email,
        })
    }

    /// In-memory database, metrics and email off.
    pub fn for_tests() -> Self {
        Self {
            app_name: format!("{DEFAULT_APP_NAME}-test"),
            app_env: AppEnv::Test,
            host: "127.0.0.1".to_string(),
            port: 0,
            database_url: "sqlite::memory:".to_string(),
            log_level: "error".to_string(),
            metrics: MetricsConfig {
                enabled: false,
                exporter_port: DEFAULT_METRICS_EXPORTER_PORT,
            },
            tracing: TracingConfig::default(),
            email: None,
        }
    }

    pub fn is_production(&self) -> bool {
        self.app_env == AppEnv::Production
    }

    pub fn service_url(&self, port: u16, path: &str) -> String {
        format!("http://{}:{}{}", self.host, port, path)
    }

    /// OTLP/HTTP traces endpoint, `None` when trace export is off.
    pub fn traces_endpoint(&self) -> Option<String> {
        if !self.tracing.enabled {
            return None;
        }
        let port = self.tracing.otlp_http_port?;
        Some(match &self.tracing.tempo_url {
            Some(url) => format!("{}/v1/traces", url.trim_end_matches('/')),
            None => self.service_url(port, "/v1/traces"),
        })
    }
}

fn parse_port(key: &'static str, raw: &str) -> Result<u16, ConfigError> {
    raw.trim().parse::<u16>().map_err(|e| ConfigError::Invalid {
        key,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: raw.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
}
