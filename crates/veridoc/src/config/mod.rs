use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::pipeline::{ClassificationMode, StageTimeouts};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub pipeline: PipelineSettings,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let pretty_logs = env::var("APP_LOG_PRETTY")
            .map(|value| matches!(value.trim(), "1" | "true" | "yes"))
            .unwrap_or(environment == AppEnvironment::Development);

        let pipeline = PipelineSettings::load()?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                pretty: pretty_logs,
            },
            pipeline,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub pretty: bool,
}

/// Collaborator endpoints and strategy selection for the document pipeline.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub classification: ClassificationMode,
    pub ocr_endpoint: String,
    pub ollama_endpoint: String,
    pub ollama_model: String,
    pub ollama_fallback_model: Option<String>,
    pub geo_csv_path: Option<PathBuf>,
    pub stage_timeouts: StageTimeouts,
}

impl PipelineSettings {
    fn load() -> Result<Self, ConfigError> {
        let classification = match env::var("PIPELINE_CLASSIFIER") {
            Ok(value) => ClassificationMode::parse(&value)
                .ok_or(ConfigError::InvalidClassifierMode { value })?,
            Err(_) => ClassificationMode::default(),
        };

        let ocr_endpoint = env::var("OCR_ENDPOINT")
            .unwrap_or_else(|_| "http://127.0.0.1:8089/ocr".to_string());
        let ollama_endpoint = env::var("OLLAMA_ENDPOINT")
            .unwrap_or_else(|_| "http://127.0.0.1:11434".to_string());
        let ollama_model = env::var("OLLAMA_MODEL").unwrap_or_else(|_| "qwen2.5".to_string());
        let ollama_fallback_model = env::var("OLLAMA_FALLBACK_MODEL")
            .ok()
            .filter(|value| !value.trim().is_empty());

        let geo_csv_path = env::var("GEO_CSV_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        let stage_timeout_secs = env::var("STAGE_TIMEOUT_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidTimeout)?;
        if stage_timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        let stage_timeouts = StageTimeouts::from_budget(Duration::from_secs(stage_timeout_secs));

        Ok(Self {
            classification,
            ocr_endpoint,
            ollama_endpoint,
            ollama_model,
            ollama_fallback_model,
            geo_csv_path,
            stage_timeouts,
        })
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidTimeout,
    InvalidClassifierMode { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidTimeout => {
                write!(f, "STAGE_TIMEOUT_SECS must be a positive integer")
            }
            ConfigError::InvalidClassifierMode { value } => {
                write!(
                    f,
                    "PIPELINE_CLASSIFIER '{}' is not one of pattern, model, pattern+model",
                    value
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
