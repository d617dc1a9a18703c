//! Server configuration.
//!
//! A JSON file supplies every section; a handful of environment variables
//! override the values most often changed per deployment.

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use atec_storage::postgres::PoolSettings;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub server: ServerConfig,
    pub postgres: PostgresConfig,
    pub crypto: CryptoConfig,
    #[serde(default)]
    pub tokens: TokenConfig,
    #[serde(default)]
    pub mail: MailConfig,
    pub redis: RedisConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    /// Public origin used to build the links sent by mail.
    pub base_url: String,
    pub shutdown_grace_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            base_url: "http://localhost:8080".to_string(),
            shutdown_grace_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    pub dsn: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_max_lifetime_secs")]
    pub max_lifetime_secs: u64,
    #[serde(default = "default_statement_timeout_ms")]
    pub statement_timeout_ms: u64,
}

impl PostgresConfig {
    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            max_connections: self.max_connections,
            min_connections: self.min_connections,
            max_lifetime: Duration::from_secs(self.max_lifetime_secs),
            statement_timeout: Duration::from_millis(self.statement_timeout_ms),
            ..PoolSettings::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CryptoConfig {
    /// File holding the key material for encryption and token signing.
    pub private_key_path: PathBuf,
    /// 16 bytes, hex encoded.
    pub iv_hex: String,
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    pub signup_ttl_secs: u64,
    pub login_ttl_secs: u64,
    pub change_password_ttl_secs: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            signup_ttl_secs: 24 * 3600,
            login_ttl_secs: 7 * 24 * 3600,
            change_password_ttl_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub api_key: String,
    pub sender_name: String,
    pub sender_email: String,
    /// When false, mails are only logged.
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub cache: RedisEndpoint,
    pub lock: RedisEndpoint,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisEndpoint {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub package_ttl_secs: u64,
    pub all_active_packages_ttl_secs: u64,
    pub nil_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            package_ttl_secs: 3600,
            all_active_packages_ttl_secs: 600,
            nil_ttl_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub resend_verification_secs: u64,
    pub submit_per_minute: u64,
    /// Peers whose `X-Forwarded-For` is believed. Empty means the socket
    /// address is always used.
    pub trusted_proxies: Vec<IpAddr>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            resend_verification_secs: 300,
            submit_per_minute: 10,
            trusted_proxies: Vec::new(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_connections() -> u32 {
    50
}

fn default_min_connections() -> u32 {
    5
}

fn default_max_lifetime_secs() -> u64 {
    30 * 60
}

fn default_statement_timeout_ms() -> u64 {
    15_000
}

fn default_bcrypt_cost() -> u32 {
    10
}

/// Read the JSON file at `path`, then apply environment overrides.
pub fn load(path: &Path) -> eyre::Result<AppConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("failed to read config at {}: {e}", path.display()))?;
    let mut config: AppConfig = serde_json::from_str(&contents)
        .map_err(|e| eyre::eyre!("invalid config at {}: {e}", path.display()))?;
    config.apply_overrides(|key| std::env::var(key).ok())?;
    Ok(config)
}

impl AppConfig {
    /// Overrides from `lookup`, normally the process environment.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> eyre::Result<()> {
        if let Some(dsn) = lookup("ATEC_DATABASE_URL") {
            self.postgres.dsn = dsn;
        }
        if let Some(url) = lookup("ATEC_REDIS_URL") {
            self.redis.cache.url = url.clone();
            self.redis.lock.url = url;
        }
        if let Some(port) = lookup("ATEC_PORT") {
            self.server.port = port
                .parse()
                .map_err(|e| eyre::eyre!("invalid ATEC_PORT {port:?}: {e}"))?;
        }
        if let Some(level) = lookup("ATEC_LOG_LEVEL") {
            self.log_level = level;
        }
        Ok(())
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_grace_secs)
    }
}
