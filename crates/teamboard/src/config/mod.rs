use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use axum::http::HeaderName;

use crate::projects::forms::AnswerPolicy;

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
    pub access: AccessConfig,
    pub forms: FormsConfig,
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

        let sign_in_path = env::var("APP_SIGN_IN_PATH").unwrap_or_else(|_| "/login".to_string());
        if !sign_in_path.starts_with('/') {
            return Err(ConfigError::InvalidSignInPath(sign_in_path));
        }
        let actor_header = env::var("APP_ACTOR_HEADER")
            .unwrap_or_else(|_| "x-actor-id".to_string())
            .trim()
            .to_ascii_lowercase();
        if HeaderName::from_bytes(actor_header.as_bytes()).is_err() {
            return Err(ConfigError::InvalidActorHeader(actor_header));
        }

        let strict_answers = match env::var("APP_STRICT_ANSWERS") {
            Ok(value) => parse_flag("APP_STRICT_ANSWERS", &value)?,
            Err(_) => false,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            access: AccessConfig {
                sign_in_path,
                actor_header,
            },
            forms: FormsConfig { strict_answers },
        })
    }
}

fn parse_flag(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            name,
            value: value.to_string(),
        }),
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

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Where unauthenticated visitors are sent and which header carries the actor id
/// stamped by the upstream authentication proxy.
#[derive(Debug, Clone)]
pub struct AccessConfig {
    pub sign_in_path: String,
    pub actor_header: String,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            sign_in_path: "/login".to_string(),
            actor_header: "x-actor-id".to_string(),
        }
    }
}

/// Answer handling knobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormsConfig {
    pub strict_answers: bool,
}

impl FormsConfig {
    pub fn answer_policy(&self) -> AnswerPolicy {
        if self.strict_answers {
            AnswerPolicy::Strict
        } else {
            AnswerPolicy::Lenient
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidSignInPath(String),
    InvalidActorHeader(String),
    InvalidFlag { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidSignInPath(path) => {
                write!(f, "APP_SIGN_IN_PATH must be an absolute path, got '{path}'")
            }
            ConfigError::InvalidActorHeader(name) => {
                write!(f, "APP_ACTOR_HEADER is not a valid header name: '{name}'")
            }
            ConfigError::InvalidFlag { name, value } => {
                write!(f, "{name} must be a boolean flag, got '{value}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidSignInPath(_)
            | ConfigError::InvalidActorHeader(_)
            | ConfigError::InvalidFlag { .. } => None,
        }
    }
}

/// Serializes tests that read or mutate process environment variables.
#[cfg(test)]
pub(crate) fn env_guard() -> &'static std::sync::Mutex<()> {
    static GUARD: std::sync::OnceLock<std::sync::Mutex<()>> = std::sync::OnceLock::new();
    GUARD.get_or_init(|| std::sync::Mutex::new(()))
}
