//! Application configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file when
//! present). Every value has a default except the database, which is optional:
//! without `DATABASE_URL` the gateway runs on the in-memory store, seeded from
//! `SEED_USERS` and `SEED_FRIENDSHIPS`.

use chat_core::Snowflake;
use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub gateway: ServerConfig,
    pub database: Option<DatabaseConfig>,
    pub cors: CorsConfig,
    pub relay: RelayConfig,
    pub snowflake: SnowflakeConfig,
    #[serde(default)]
    pub seed: SeedConfig,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default)]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "staging" => Ok(Self::Staging),
            "development" | "dev" => Ok(Self::Development),
            other => Err(ConfigError::InvalidValue("APP_ENV", other.to_string())),
        }
    }
}

/// Listen address of the gateway
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// CORS configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CorsConfig {
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

/// Relay tuning: heartbeats and per-connection outbound buffer
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    #[serde(default = "default_heartbeat_timeout_ms")]
    pub heartbeat_timeout_ms: u64,
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,
}

impl RelayConfig {
    #[must_use]
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    #[must_use]
    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_millis(self.heartbeat_timeout_ms)
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            heartbeat_timeout_ms: default_heartbeat_timeout_ms(),
            outbound_buffer: default_outbound_buffer(),
        }
    }
}

/// Snowflake ID generator configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnowflakeConfig {
    #[serde(default)]
    pub worker_id: u16,
}

/// Users and friendships loaded into the in-memory store at startup
///
/// `SEED_USERS` is a comma-separated list of `id=name`; `SEED_FRIENDSHIPS` a
/// comma-separated list of `id:id` pairs between seeded users.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SeedConfig {
    #[serde(default)]
    pub users: Vec<(Snowflake, String)>,
    #[serde(default)]
    pub friendships: Vec<(Snowflake, Snowflake)>,
}

impl SeedConfig {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty() && self.friendships.is_empty()
    }

    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let users = list_var(lookup, "SEED_USERS")
            .into_iter()
            .map(|entry| {
                let (id, name) = entry
                    .split_once('=')
                    .ok_or_else(|| ConfigError::InvalidValue("SEED_USERS", entry.clone()))?;
                let id = parse_id("SEED_USERS", id)?;
                let name = name.trim();
                if name.is_empty() {
                    return Err(ConfigError::InvalidValue("SEED_USERS", entry.clone()));
                }
                Ok((id, name.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let friendships = list_var(lookup, "SEED_FRIENDSHIPS")
            .into_iter()
            .map(|entry| {
                let (a, b) = entry
                    .split_once(':')
                    .ok_or_else(|| ConfigError::InvalidValue("SEED_FRIENDSHIPS", entry.clone()))?;
                let pair = (parse_id("SEED_FRIENDSHIPS", a)?, parse_id("SEED_FRIENDSHIPS", b)?);
                let known = |id: Snowflake| users.iter().any(|(user, _)| *user == id);
                if pair.0 == pair.1 || !known(pair.0) || !known(pair.1) {
                    return Err(ConfigError::InvalidValue("SEED_FRIENDSHIPS", entry.clone()));
                }
                Ok(pair)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { users, friendships })
    }
}

// Default value functions
fn default_app_name() -> String {
    "chat-relay".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    5
}

fn default_heartbeat_interval_ms() -> u64 {
    30_000
}

fn default_heartbeat_timeout_ms() -> u64 {
    90_000
}

fn default_outbound_buffer() -> usize {
    256
}

/// Parse an optional variable, failing on values that are present but malformed
fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(key, raw)),
    }
}

/// Split a comma-separated variable into trimmed, non-empty entries
fn list_var(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Vec<String> {
    lookup(key)
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_id(key: &'static str, raw: &str) -> Result<Snowflake, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(key, raw.to_string()))
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if a variable is present but cannot be parsed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = match lookup("APP_ENV") {
            Some(raw) if !raw.trim().is_empty() => raw.parse()?,
            _ => Environment::default(),
        };

        let database = match lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()) {
            Some(url) => Some(DatabaseConfig {
                url,
                max_connections: parse_var(&lookup, "DATABASE_MAX_CONNECTIONS")?
                    .unwrap_or_else(default_max_connections),
                min_connections: parse_var(&lookup, "DATABASE_MIN_CONNECTIONS")?
                    .unwrap_or_else(default_min_connections),
            }),
            None => None,
        };

        let relay = RelayConfig {
            heartbeat_interval_ms: parse_var(&lookup, "HEARTBEAT_INTERVAL_MS")?
                .unwrap_or_else(default_heartbeat_interval_ms),
            heartbeat_timeout_ms: parse_var(&lookup, "HEARTBEAT_TIMEOUT_MS")?
                .unwrap_or_else(default_heartbeat_timeout_ms),
            outbound_buffer: parse_var(&lookup, "OUTBOUND_BUFFER")?
                .unwrap_or_else(default_outbound_buffer),
        };
        if relay.heartbeat_timeout_ms <= relay.heartbeat_interval_ms {
            return Err(ConfigError::InvalidValue(
                "HEARTBEAT_TIMEOUT_MS",
                format!(
                    "{} must exceed HEARTBEAT_INTERVAL_MS ({})",
                    relay.heartbeat_timeout_ms, relay.heartbeat_interval_ms
                ),
            ));
        }
        if relay.outbound_buffer == 0 {
            return Err(ConfigError::InvalidValue("OUTBOUND_BUFFER", "0".to_string()));
        }

        let seed = SeedConfig::from_lookup(&lookup)?;

        let worker_id: u16 = parse_var(&lookup, "WORKER_ID")?.unwrap_or(0);
        if worker_id > 1023 {
            return Err(ConfigError::InvalidValue("WORKER_ID", worker_id.to_string()));
        }

        Ok(Self {
            app: AppSettings {
                name: lookup("APP_NAME").unwrap_or_else(default_app_name),
                env,
            },
            gateway: ServerConfig {
                host: lookup("GATEWAY_HOST").unwrap_or_else(default_host),
                port: parse_var(&lookup, "GATEWAY_PORT")?.unwrap_or_else(default_port),
            },
            database,
            cors: CorsConfig {
                allowed_origins: list_var(&lookup, "CORS_ALLOWED_ORIGINS"),
            },
            relay,
            snowflake: SnowflakeConfig { worker_id },
            seed,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
