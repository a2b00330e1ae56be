use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

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
    pub accountability: AccountabilityConfig,
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

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            accountability: AccountabilityConfig::from_env()?,
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

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

pub const DEFAULT_BACKDATE_LIMIT_DAYS: i64 = 7;
pub const MAX_BACKDATE_LIMIT_DAYS: i64 = 365;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 2_000;

/// Routing and policy dials for the accountability points engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountabilityConfig {
    /// Standard operational inbox for threshold alerts below the termination tier.
    pub operations_email: String,
    /// Recipients for termination-tier alerts.
    pub escalation_emails: Vec<String>,
    /// Receives delivery failure notices.
    pub admin_email: String,
    pub backdate_limit_days: i64,
    pub email_retry_delay: Duration,
}

impl Default for AccountabilityConfig {
    fn default() -> Self {
        Self {
            operations_email: "operations@manager-hub.local".to_string(),
            escalation_emails: vec![
                "director@manager-hub.local".to_string(),
                "hr@manager-hub.local".to_string(),
            ],
            admin_email: "admin@manager-hub.local".to_string(),
            backdate_limit_days: DEFAULT_BACKDATE_LIMIT_DAYS,
            email_retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        }
    }
}

impl AccountabilityConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let operations_email =
            env::var("HUB_OPERATIONS_EMAIL").unwrap_or(defaults.operations_email);
        let escalation_emails = match env::var("HUB_ESCALATION_EMAILS") {
            Ok(raw) => {
                let parsed = split_addresses(&raw);
                if parsed.is_empty() {
                    return Err(ConfigError::EmptyEscalationList);
                }
                parsed
            }
            Err(_) => defaults.escalation_emails,
        };
        let admin_email = env::var("HUB_ADMIN_EMAIL").unwrap_or(defaults.admin_email);

        let backdate_limit_days = match env::var("HUB_BACKDATE_LIMIT_DAYS") {
            Ok(raw) => {
                let days = raw
                    .trim()
                    .parse::<i64>()
                    .ok()
                    .filter(|days| *days >= 0)
                    .ok_or(ConfigError::InvalidBackdateLimit)?;
                if days > MAX_BACKDATE_LIMIT_DAYS {
                    return Err(ConfigError::BackdateLimitTooLarge {
                        max: MAX_BACKDATE_LIMIT_DAYS,
                    });
                }
                days
            }
            Err(_) => defaults.backdate_limit_days,
        };

        let email_retry_delay = match env::var("HUB_EMAIL_RETRY_DELAY_MS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| ConfigError::InvalidRetryDelay)?,
            Err(_) => defaults.email_retry_delay,
        };

        Ok(Self {
            operations_email,
            escalation_emails,
            admin_email,
            backdate_limit_days,
            email_retry_delay,
        })
    }
}

fn split_addresses(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|address| !address.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidBackdateLimit,
    BackdateLimitTooLarge { max: i64 },
    InvalidRetryDelay,
    EmptyEscalationList,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidBackdateLimit => {
                write!(f, "HUB_BACKDATE_LIMIT_DAYS must be a non-negative integer")
            }
            ConfigError::BackdateLimitTooLarge { max } => {
                write!(f, "HUB_BACKDATE_LIMIT_DAYS must not exceed {max}")
            }
            ConfigError::InvalidRetryDelay => {
                write!(f, "HUB_EMAIL_RETRY_DELAY_MS must be a whole number of milliseconds")
            }
            ConfigError::EmptyEscalationList => {
                write!(f, "HUB_ESCALATION_EMAILS must list at least one address")
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
