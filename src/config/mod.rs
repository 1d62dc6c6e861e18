use crate::workflows::staff::LeaveUnitPolicy;
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

const DEFAULT_APP_ID: &str = "default-app-id";
const DEFAULT_STORES: &str = "Main Store,Branch Store";

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
    pub dashboard: DashboardConfig,
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

        let dashboard = DashboardConfig::from_env()?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            dashboard,
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

/// Tenant namespace and pharmacy-specific policy knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    /// Artifact namespace every tenant path is rooted under.
    pub app_id: String,
    /// The fixed set of stores a staff member may be assigned to.
    pub stores: Vec<String>,
    pub leave_units: LeaveUnitPolicy,
}

impl DashboardConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let app_id = env::var("APP_ID")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_APP_ID.to_string());

        let stores = parse_store_list(
            &env::var("APP_STORES").unwrap_or_else(|_| DEFAULT_STORES.to_string()),
        )?;

        let leave_units = match env::var("APP_LEAVE_UNITS") {
            Ok(raw) => LeaveUnitPolicy::parse(&raw).ok_or(ConfigError::InvalidLeaveUnits(raw))?,
            Err(_) => LeaveUnitPolicy::PerRecord,
        };

        Ok(Self {
            app_id,
            stores,
            leave_units,
        })
    }

    pub fn is_known_store(&self, store: &str) -> bool {
        self.stores.iter().any(|known| known == store.trim())
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            app_id: DEFAULT_APP_ID.to_string(),
            stores: DEFAULT_STORES.split(',').map(str::to_string).collect(),
            leave_units: LeaveUnitPolicy::PerRecord,
        }
    }
}

fn parse_store_list(raw: &str) -> Result<Vec<String>, ConfigError> {
    let stores: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|store| !store.is_empty())
        .map(str::to_string)
        .collect();

    if stores.is_empty() {
        return Err(ConfigError::EmptyStoreList);
    }

    Ok(stores)
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    EmptyStoreList,
    InvalidLeaveUnits(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::EmptyStoreList => {
                write!(f, "APP_STORES must name at least one store")
            }
            ConfigError::InvalidLeaveUnits(value) => write!(
                f,
                "APP_LEAVE_UNITS must be 'per_record' or 'calendar_days', got '{}'",
                value
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::EmptyStoreList
            | ConfigError::InvalidLeaveUnits(_) => None,
        }
    }
}
