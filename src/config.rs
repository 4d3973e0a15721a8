use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::alert::AlertTiming;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub detection: DetectionConfig,

    #[serde(default)]
    pub capture: CaptureSettings,

    #[serde(default)]
    pub alert: AlertConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        Ok(config)
    }

    /// Load config from default locations or create default
    pub fn load_or_default() -> Result<Self> {
        let paths = [
            PathBuf::from("/etc/deauthmon/config.toml"),
            dirs_next::config_dir()
                .map(|p| p.join("deauthmon/config.toml"))
                .unwrap_or_default(),
            PathBuf::from("config.toml"),
        ];

        for path in &paths {
            if path.exists() {
                return Self::load(path);
            }
        }

        Ok(Self::default())
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Network names to watch for deauthentication attacks
    #[serde(default)]
    pub monitored_ssids: Vec<String>,

    /// Max events recorded per access point between session clears
    #[serde(default = "default_packet_threshold")]
    pub packet_threshold: u32,

    /// Per-channel listen time during discovery (milliseconds)
    #[serde(default = "default_channel_dwell_ms")]
    pub channel_dwell_ms: u64,

    /// Hop interval while monitoring (milliseconds)
    #[serde(default = "default_channel_hop_interval_ms")]
    pub channel_hop_interval_ms: u64,

    /// Batch reporting interval (seconds)
    #[serde(default = "default_reporting_interval_secs")]
    pub reporting_interval_secs: u64,

    /// Monitor every channel when discovery finds none of the monitored
    /// names; false means monitor nothing until the next discovery
    #[serde(default)]
    pub scan_all_when_none: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            monitored_ssids: Vec::new(),
            packet_threshold: default_packet_threshold(),
            channel_dwell_ms: default_channel_dwell_ms(),
            channel_hop_interval_ms: default_channel_hop_interval_ms(),
            reporting_interval_secs: default_reporting_interval_secs(),
            scan_all_when_none: false,
        }
    }
}

impl DetectionConfig {
    pub fn channel_dwell(&self) -> Duration {
        Duration::from_millis(self.channel_dwell_ms)
    }

    pub fn hop_interval(&self) -> Duration {
        Duration::from_millis(self.channel_hop_interval_ms)
    }

    pub fn reporting_interval(&self) -> Duration {
        Duration::from_secs(self.reporting_interval_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureSettings {
    /// Wireless interface to capture on (must support monitor mode)
    #[serde(default)]
    pub interface: String,

    /// Capture ring slots
    #[serde(default = "default_ring_capacity")]
    pub ring_capacity: usize,

    /// pcap buffer size in bytes
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            interface: String::new(),
            ring_capacity: default_ring_capacity(),
            buffer_size: default_buffer_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Buzzer tone frequency in Hz
    #[serde(default = "default_buzzer_freq")]
    pub buzzer_freq_hz: u32,

    /// How long the buzzer sounds per alert (milliseconds)
    #[serde(default = "default_buzzer_duration_ms")]
    pub buzzer_duration_ms: u64,

    /// Quiet period before the indicator may clear (seconds)
    #[serde(default = "default_silence_gap_secs")]
    pub silence_gap_secs: u64,

    /// Minimum indicator hold after activation (seconds)
    #[serde(default = "default_hold_secs")]
    pub hold_secs: u64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            buzzer_freq_hz: default_buzzer_freq(),
            buzzer_duration_ms: default_buzzer_duration_ms(),
            silence_gap_secs: default_silence_gap_secs(),
            hold_secs: default_hold_secs(),
        }
    }
}

impl AlertConfig {
    pub fn timing(&self) -> AlertTiming {
        AlertTiming {
            buzzer_duration: Duration::from_millis(self.buzzer_duration_ms),
            silence_gap: Duration::from_secs(self.silence_gap_secs),
            hold_duration: Duration::from_secs(self.hold_secs),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Batch report endpoint; empty disables remote reporting
    #[serde(default)]
    pub endpoint_url: String,

    /// Optional custom header added to each report request
    #[serde(default)]
    pub custom_header_name: Option<String>,

    #[serde(default)]
    pub custom_header_value: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_api_timeout")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint_url: String::new(),
            custom_header_name: None,
            custom_header_value: None,
            timeout_secs: default_api_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Directory for session CSV logs
    #[serde(default = "default_session_dir")]
    pub session_dir: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            session_dir: default_session_dir(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_packet_threshold() -> u32 {
    250
}

fn default_channel_dwell_ms() -> u64 {
    100
}

fn default_channel_hop_interval_ms() -> u64 {
    75
}

fn default_reporting_interval_secs() -> u64 {
    300
}

fn default_ring_capacity() -> usize {
    128
}

fn default_buffer_size() -> usize {
    65536
}

fn default_buzzer_freq() -> u32 {
    4000
}

fn default_buzzer_duration_ms() -> u64 {
    2000
}

fn default_silence_gap_secs() -> u64 {
    30
}

fn default_hold_secs() -> u64 {
    300
}

fn default_api_timeout() -> u64 {
    10
}

fn default_session_dir() -> String {
    "/var/log/deauthmon".to_string()
}
