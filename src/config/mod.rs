//! Monitor configuration loaded from `config.toml`.
//!
//! Every section has defaults matching the production deployment, so a
//! config file only needs the folder paths and expected file names. Loading
//! fails fast on anything that would make monitoring meaningless: blank
//! folders, an empty expected-file list, inverted windows.

mod time_of_day;


use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub use time_of_day::parse_time_of_day;

use crate::models::constants::MAX_HOURS_PER_GB;

/// Config file name inside the default config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub folders: FolderConfig,
    pub email: EmailConfig,
    pub runtime: RuntimeConfig,
    pub sla: SlaConfig,
    pub monitoring: MonitoringConfig,
}

/// The five filesystem locations the monitor touches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FolderConfig {
    /// Primary intake: vendor extract utility drop.
    pub vendor_extract: PathBuf,
    /// Where accepted vendor files are expected to reappear.
    pub proprietary: PathBuf,
    pub hold: PathBuf,
    pub drop: PathBuf,
    pub report_output: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    /// SMTP relay host. Leave empty to log notifications instead of sending.
    pub smtp_host: String,
    pub smtp_port: u16,
    pub enable_tls: bool,
    pub username: String,
    pub password: String,
    pub sender: String,
    pub it_ops_recipients: Vec<String>,
    pub internal_recipients: Vec<String>,
    pub client_recipients: Vec<String>,
    pub retry_count: u32,
    pub retry_delay_secs: u64,
    /// Upper bound for a single delivery attempt.
    pub command_timeout_secs: u64,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: String::new(),
            smtp_port: 25,
            enable_tls: false,
            username: String::new(),
            password: String::new(),
            sender: String::new(),
            it_ops_recipients: Vec::new(),
            internal_recipients: Vec::new(),
            client_recipients: Vec::new(),
            retry_count: 3,
            retry_delay_secs: 15,
            command_timeout_secs: 60,
        }
    }
}

impl EmailConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub poll_interval_secs: u64,
    /// Attempts for transient folder-listing failures.
    pub retry_count: u32,
    pub retry_delay_ms: u64,
    pub partial_file_stable_secs: u64,
    /// IANA time-zone identifier for all window boundaries.
    pub time_zone: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 20,
            retry_count: 5,
            retry_delay_ms: 2000,
            partial_file_stable_secs: 20,
            time_zone: "Asia/Kolkata".to_string(),
        }
    }
}

impl RuntimeConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlaConfig {
    pub large_file_threshold_mb: u64,
    pub processing_hours_per_gb: f64,
    #[serde(with = "time_of_day")]
    pub deadline: NaiveTime,
}

impl Default for SlaConfig {
    fn default() -> Self {
        Self {
            large_file_threshold_mb: 700,
            processing_hours_per_gb: 4.3,
            deadline: NaiveTime::from_hms_opt(10, 0, 0).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub expected_file_count: usize,
    /// Accepted name prefixes for the primary intake.
    pub expected_files: Vec<String>,
    #[serde(with = "time_of_day")]
    pub vendor_window_start: NaiveTime,
    #[serde(with = "time_of_day")]
    pub vendor_window_end: NaiveTime,
    #[serde(with = "time_of_day")]
    pub hold_window_end: NaiveTime,
    #[serde(with = "time_of_day")]
    pub drop_cutoff: NaiveTime,
    pub stale_file_minutes: u64,
    pub vendor_pattern: String,
    pub hold_pattern: String,
    pub drop_pattern: String,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        let hm = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap_or_default();
        Self {
            expected_file_count: 2,
            expected_files: Vec::new(),
            vendor_window_start: hm(6, 0),
            vendor_window_end: hm(8, 30),
            hold_window_end: hm(10, 0),
            drop_cutoff: hm(9, 55),
            stale_file_minutes: 10,
            vendor_pattern: "*.txt".to_string(),
            hold_pattern: "*.*".to_string(),
            drop_pattern: "*.*".to_string(),
        }
    }
}

/// Default config location: `<config dir>/outbound-monitor/config.toml`.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("outbound-monitor")
        .join(CONFIG_FILE_NAME)
}

/// Read, parse and validate a config file.
pub fn load(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let config = parse(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    config.validate()?;
    Ok(config)
}

/// Parse config text without validating it.
pub fn parse(raw: &str) -> Result<AppConfig, toml::de::Error> {
    toml::from_str(raw)
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let folders = [
            ("vendor_extract", &self.folders.vendor_extract),
            ("proprietary", &self.folders.proprietary),
            ("hold", &self.folders.hold),
            ("drop", &self.folders.drop),
            ("report_output", &self.folders.report_output),
        ];
        for (name, path) in folders {
            if path.as_os_str().to_string_lossy().trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "folder path '{name}' is mandatory"
                )));
            }
        }

        if self
            .monitoring
            .expected_files
            .iter()
            .all(|f| f.trim().is_empty())
        {
            return Err(ConfigError::Invalid(
                "expected file list cannot be empty".to_string(),
            ));
        }

        let m = &self.monitoring;
        let windows = [
            ("vendor_window_end", m.vendor_window_end),
            ("hold_window_end", m.hold_window_end),
            ("drop_cutoff", m.drop_cutoff),
        ];
        for (name, end) in windows {
            if end <= m.vendor_window_start {
                return Err(ConfigError::Invalid(format!(
                    "{name} ({}) must be after vendor_window_start ({})",
                    end.format("%H:%M"),
                    m.vendor_window_start.format("%H:%M")
                )));
            }
        }

        if m.stale_file_minutes == 0 {
            return Err(ConfigError::Invalid(
                "stale_file_minutes must be greater than zero".to_string(),
            ));
        }

        if self.runtime.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_secs must be greater than zero".to_string(),
            ));
        }

        let rate = self.sla.processing_hours_per_gb;
        if !(rate.is_finite() && (0.0..=MAX_HOURS_PER_GB).contains(&rate)) {
            return Err(ConfigError::Invalid(format!(
                "processing_hours_per_gb must be between 0 and {MAX_HOURS_PER_GB}"
            )));
        }

        for (name, pattern) in [
            ("vendor_pattern", &m.vendor_pattern),
            ("hold_pattern", &m.hold_pattern),
            ("drop_pattern", &m.drop_pattern),
        ] {
            glob::Pattern::new(pattern).map_err(|e| {
                ConfigError::Invalid(format!("{name} '{pattern}' is not a valid glob: {e}"))
            })?;
        }

        Ok(())
    }

    /// Create every configured folder that does not exist yet.
    pub fn ensure_folders(&self) -> std::io::Result<()> {
        for dir in [
            &self.folders.vendor_extract,
            &self.folders.proprietary,
            &self.folders.hold,
            &self.folders.drop,
            &self.folders.report_output,
        ] {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}
