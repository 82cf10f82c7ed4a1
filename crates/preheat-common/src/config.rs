//! Configuration for Preheat

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database configuration
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Warmup controller configuration
    #[serde(default)]
    pub warmup: WarmupConfig,

    /// Outbound SMTP configuration
    #[serde(default)]
    pub smtp: SmtpConfig,

    /// Notification webhook configuration
    #[serde(default)]
    pub notify: NotifyConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database backend: only "postgres" is supported
    #[serde(default = "default_db_backend")]
    pub backend: String,

    /// Database URL
    pub url: Option<String>,

    /// Maximum connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_db_backend() -> String {
    "postgres".to_string()
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    5
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log filter when RUST_LOG is unset
    #[serde(default = "default_log_filter")]
    pub filter: String,

    /// Emit logs as JSON
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

fn default_log_filter() -> String {
    "info,preheat=debug".to_string()
}

/// Warmup controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarmupConfig {
    /// Interval between daily job scheduling sweeps (seconds)
    #[serde(default = "default_schedule_interval")]
    pub schedule_interval_secs: u64,

    /// Interval between job execution sweeps (seconds)
    #[serde(default = "default_execute_interval")]
    pub execute_interval_secs: u64,

    /// Interval between interaction simulation sweeps (seconds)
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Interval between health monitor runs (seconds)
    #[serde(default = "default_monitor_interval")]
    pub monitor_interval_secs: u64,

    /// First hour of the business sending window (0-23, UTC)
    #[serde(default = "default_business_hours_start")]
    pub business_hours_start: u32,

    /// Hour the business sending window closes (exclusive, 0-23, UTC)
    #[serde(default = "default_business_hours_end")]
    pub business_hours_end: u32,

    /// Minimum pause between consecutive sends (seconds)
    #[serde(default = "default_send_delay_min")]
    pub send_delay_min_secs: u64,

    /// Maximum pause between consecutive sends (seconds)
    #[serde(default = "default_send_delay_max")]
    pub send_delay_max_secs: u64,

    /// Hard timeout for a single transport send call (seconds)
    #[serde(default = "default_send_timeout")]
    pub send_timeout_secs: u64,

    /// Hours after which a running job is considered stuck
    #[serde(default = "default_stale_job_hours")]
    pub stale_job_hours: i64,

    /// Warmup recipient pools per recipient type
    #[serde(default)]
    pub pools: RecipientPools,
}

impl Default for WarmupConfig {
    fn default() -> Self {
        Self {
            schedule_interval_secs: default_schedule_interval(),
            execute_interval_secs: default_execute_interval(),
            sweep_interval_secs: default_sweep_interval(),
            monitor_interval_secs: default_monitor_interval(),
            business_hours_start: default_business_hours_start(),
            business_hours_end: default_business_hours_end(),
            send_delay_min_secs: default_send_delay_min(),
            send_delay_max_secs: default_send_delay_max(),
            send_timeout_secs: default_send_timeout(),
            stale_job_hours: default_stale_job_hours(),
            pools: RecipientPools::default(),
        }
    }
}

fn default_schedule_interval() -> u64 {
    3600
}

fn default_execute_interval() -> u64 {
    300
}

fn default_sweep_interval() -> u64 {
    300
}

fn default_monitor_interval() -> u64 {
    900
}

fn default_business_hours_start() -> u32 {
    9
}

fn default_business_hours_end() -> u32 {
    17
}

fn default_send_delay_min() -> u64 {
    1
}

fn default_send_delay_max() -> u64 {
    3
}

fn default_send_timeout() -> u64 {
    30
}

fn default_stale_job_hours() -> i64 {
    4
}

/// Recipient addresses available to the job generator, per risk class.
///
/// Contact management is owned by another subsystem; warmup sends go to
/// seed addresses provisioned through configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecipientPools {
    #[serde(default)]
    pub internal: Vec<PoolEntry>,

    #[serde(default)]
    pub partner: Vec<PoolEntry>,

    #[serde(default)]
    pub existing_customer: Vec<PoolEntry>,

    #[serde(default)]
    pub prospect: Vec<PoolEntry>,
}

/// A single seed recipient
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolEntry {
    pub email: String,

    pub name: Option<String>,
}

/// Outbound SMTP configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    /// Relay hostname
    #[serde(default = "default_smtp_host")]
    pub host: String,

    /// Relay port
    #[serde(default = "default_smtp_port")]
    pub port: u16,

    /// Relay username
    pub username: Option<String>,

    /// Relay password
    pub password: Option<String>,

    /// Use implicit TLS
    #[serde(default)]
    pub use_tls: bool,

    /// Use STARTTLS
    #[serde(default = "default_use_starttls")]
    pub use_starttls: bool,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: default_smtp_host(),
            port: default_smtp_port(),
            username: None,
            password: None,
            use_tls: false,
            use_starttls: default_use_starttls(),
        }
    }
}

fn default_smtp_host() -> String {
    "localhost".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_use_starttls() -> bool {
    true
}

/// Notification webhook configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Webhook endpoint; notifications are dropped when unset
    pub webhook_url: Option<String>,

    /// Shared secret for HMAC request signing
    pub secret: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_notify_timeout")]
    pub timeout_secs: u64,
}

fn default_notify_timeout() -> u64 {
    5
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Load configuration from default locations
    pub fn load() -> crate::Result<Self> {
        let paths = [
            std::path::PathBuf::from("./config.toml"),
            std::path::PathBuf::from("/etc/preheat/config.toml"),
        ];

        for path in paths {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Err(crate::Error::Config(
            "No configuration file found".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let warmup = WarmupConfig::default();
        assert_eq!(warmup.business_hours_start, 9);
        assert_eq!(warmup.business_hours_end, 17);
        assert_eq!(warmup.stale_job_hours, 4);
        assert_eq!(warmup.send_delay_min_secs, 1);
        assert_eq!(warmup.send_delay_max_secs, 3);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[database]
backend = "postgres"
url = "postgres://localhost/preheat"

[warmup]
schedule_interval_secs = 600
business_hours_start = 8
business_hours_end = 18

[[warmup.pools.internal]]
email = "team@example.com"
name = "Team"

[smtp]
host = "smtp.example.com"
port = 2525
"#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.database.backend, "postgres");
        assert_eq!(config.warmup.schedule_interval_secs, 600);
        assert_eq!(config.warmup.business_hours_start, 8);
        assert_eq!(config.warmup.pools.internal.len(), 1);
        assert_eq!(config.smtp.host, "smtp.example.com");
        assert_eq!(config.smtp.port, 2525);
    }
}
