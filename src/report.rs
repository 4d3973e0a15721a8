//! Remote Batch Reporting
//!
//! Ships the session event list to a configured HTTP endpoint as a JSON
//! array, one object per event. Reporting happens while capture is
//! suspended; the [`Uplink`] trait marks the spot where a battery deployment
//! would bring connectivity up and down around the send.

use chrono::SecondsFormat;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::ApiConfig;
use crate::session::DeauthEvent;

/// Reporting errors
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("API endpoint not configured")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned status {0}")]
    Status(u16),
}

/// Uplink errors
#[derive(Debug, Error)]
pub enum UplinkError {
    #[error("uplink unavailable: {0}")]
    Unavailable(String),
}

/// Connectivity gate around the reporting window.
///
/// The sensor captures with the radio in monitor mode and only needs a
/// routed network while a batch is being sent.
pub trait Uplink {
    fn bring_up(&mut self) -> Result<(), UplinkError>;
    fn bring_down(&mut self);
}

/// Uplink for hosts whose management network is always routed
#[derive(Debug, Default)]
pub struct SystemUplink;

impl Uplink for SystemUplink {
    fn bring_up(&mut self) -> Result<(), UplinkError> {
        debug!("using system network uplink");
        Ok(())
    }

    fn bring_down(&mut self) {}
}

/// HTTP batch reporter
pub struct ApiReporter {
    config: ApiConfig,
    client: reqwest::Client,
}

impl ApiReporter {
    pub fn new(config: ApiConfig) -> Result<Self, ReportError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    pub fn is_configured(&self) -> bool {
        !self.config.endpoint_url.is_empty()
    }

    /// Send the full session event list.
    ///
    /// An empty batch is a no-op success; a missing endpoint is an error the
    /// caller downgrades to a log line.
    pub async fn send_batch(&self, events: &[DeauthEvent]) -> Result<(), ReportError> {
        if events.is_empty() {
            debug!("no events to report");
            return Ok(());
        }

        if !self.is_configured() {
            return Err(ReportError::NotConfigured);
        }

        let payload = build_payload(events);

        let mut request = self
            .client
            .post(&self.config.endpoint_url)
            .header("Content-Type", "application/json")
            .json(&payload);

        if let (Some(name), Some(value)) = (
            self.config.custom_header_name.as_deref(),
            self.config.custom_header_value.as_deref(),
        ) {
            request = request.header(name, value);
        }

        info!("sending {} events to {}", events.len(), self.config.endpoint_url);
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            debug!("API response: {}", status.as_u16());
            Ok(())
        } else {
            warn!("API rejected batch: {}", status.as_u16());
            Err(ReportError::Status(status.as_u16()))
        }
    }
}

/// JSON array payload, one object per event, timestamps in ISO 8601
fn build_payload(events: &[DeauthEvent]) -> Value {
    Value::Array(
        events
            .iter()
            .map(|e| {
                json!({
                    "timestamp": e.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
                    "target_ssid": e.target_ssid,
                    "target_bssid": e.target_bssid,
                    "attacker_mac": e.attacker_mac,
                    "channel": e.channel,
                    "rssi": e.rssi,
                    "packet_count": e.packet_count,
                })
            })
            .collect(),
    )
}
