//! Wireless Interface Management
//!
//! Uses nl80211 (via neli-wifi) for interface discovery and the iw/ip
//! commands for mode and channel changes. Monitor mode and channel control
//! require root or CAP_NET_ADMIN.

use neli_wifi::Socket;
use thiserror::Error;

/// Wireless interface errors
#[derive(Debug, Error)]
pub enum WirelessError {
    #[error("netlink socket error: {0}")]
    Socket(String),

    #[error("nl80211 error: {0}")]
    Nl80211(String),

    #[error("interface not found: {0}")]
    InterfaceNotFound(String),

    #[error("invalid channel: {0}")]
    InvalidChannel(u8),

    #[error("system command failed: {0}")]
    System(String),
}

/// Wireless interface mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceMode {
    /// Standard managed mode (client)
    Managed,
    /// Monitor mode for passive capture
    Monitor,
    /// Access point mode
    Ap,
    /// Unknown/other mode
    Unknown,
}

impl InterfaceMode {
    fn as_str(&self) -> &'static str {
        match self {
            InterfaceMode::Managed => "managed",
            InterfaceMode::Monitor => "monitor",
            InterfaceMode::Ap => "ap",
            InterfaceMode::Unknown => "managed",
        }
    }
}

/// Convert a channel number to its center frequency in MHz
pub fn channel_to_freq(channel: u8) -> u32 {
    match channel {
        1..=13 => 2407 + channel as u32 * 5,
        14 => 2484,
        36..=165 => 5000 + channel as u32 * 5,
        _ => 0,
    }
}

/// Wireless interface wrapper
#[derive(Debug)]
pub struct WirelessInterface {
    /// Interface name (wlan0, etc.)
    pub name: String,
    /// Interface index
    pub ifindex: i32,
    /// Current mode
    pub mode: InterfaceMode,
    /// Current channel
    pub channel: Option<u8>,
    /// MAC address
    pub mac_addr: Option<[u8; 6]>,
}

impl WirelessInterface {
    /// List all wireless interfaces known to nl80211
    pub fn list() -> Result<Vec<Self>, WirelessError> {
        let mut socket = Socket::connect().map_err(|e| WirelessError::Socket(e.to_string()))?;

        let interfaces = socket
            .get_interfaces_info()
            .map_err(|e| WirelessError::Nl80211(e.to_string()))?;

        let mut result = Vec::new();
        for iface in interfaces {
            let name = iface
                .name
                .map(|n| String::from_utf8_lossy(&n).trim_end_matches('\0').to_string())
                .unwrap_or_default();

            let mac_addr = iface.mac.and_then(|m| {
                if m.len() >= 6 {
                    let mut arr = [0u8; 6];
                    arr.copy_from_slice(&m[..6]);
                    Some(arr)
                } else {
                    None
                }
            });

            let mode = Self::query_mode(&name).unwrap_or(InterfaceMode::Unknown);

            result.push(Self {
                name,
                ifindex: iface.index.unwrap_or(0),
                mode,
                channel: iface.channel.map(|c| c as u8),
                mac_addr,
            });
        }

        Ok(result)
    }

    /// Get a specific interface by name
    pub fn get(name: &str) -> Result<Self, WirelessError> {
        Self::list()?
            .into_iter()
            .find(|i| i.name == name)
            .ok_or_else(|| WirelessError::InterfaceNotFound(name.to_string()))
    }

    pub fn is_monitor_mode(&self) -> bool {
        self.mode == InterfaceMode::Monitor
    }

    /// Read the current mode from `iw dev <name> info`
    fn query_mode(name: &str) -> Option<InterfaceMode> {
        use std::process::Command;
        let output = Command::new("iw").args(["dev", name, "info"]).output().ok()?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        for line in stdout.lines() {
            let line = line.trim();
            if let Some(mode_str) = line.strip_prefix("type ") {
                return Some(match mode_str {
                    "managed" => InterfaceMode::Managed,
                    "monitor" => InterfaceMode::Monitor,
                    "AP" => InterfaceMode::Ap,
                    _ => InterfaceMode::Unknown,
                });
            }
        }
        None
    }

    /// Set interface mode (requires root/CAP_NET_ADMIN)
    pub fn set_mode(&mut self, mode: InterfaceMode) -> Result<(), WirelessError> {
        use std::process::Command;

        // The link must be down for a type change
        Self::set_link(&self.name, "down")?;

        let status = Command::new("iw")
            .args(["dev", &self.name, "set", "type", mode.as_str()])
            .status()
            .map_err(|e| WirelessError::System(e.to_string()))?;

        if !status.success() {
            return Err(WirelessError::Nl80211(format!(
                "failed to set {} to {}",
                self.name,
                mode.as_str()
            )));
        }

        Self::set_link(&self.name, "up")?;

        self.mode = mode;
        Ok(())
    }

    /// Retune to a channel
    pub fn set_channel(&mut self, channel: u8) -> Result<(), WirelessError> {
        let freq = channel_to_freq(channel);
        if freq == 0 {
            return Err(WirelessError::InvalidChannel(channel));
        }

        use std::process::Command;
        let status = Command::new("iw")
            .args(["dev", &self.name, "set", "freq", &freq.to_string()])
            .status()
            .map_err(|e| WirelessError::System(e.to_string()))?;

        if !status.success() {
            return Err(WirelessError::Nl80211(format!(
                "failed to set {} to channel {}",
                self.name, channel
            )));
        }

        self.channel = Some(channel);
        Ok(())
    }

    fn set_link(name: &str, state: &str) -> Result<(), WirelessError> {
        use std::process::Command;
        let status = Command::new("ip")
            .args(["link", "set", name, state])
            .status()
            .map_err(|e| WirelessError::System(e.to_string()))?;

        if !status.success() {
            return Err(WirelessError::System(format!("ip link set {} {}", name, state)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_to_freq() {
        assert_eq!(channel_to_freq(1), 2412);
        assert_eq!(channel_to_freq(6), 2437);
        assert_eq!(channel_to_freq(11), 2462);
        assert_eq!(channel_to_freq(14), 2484);
        assert_eq!(channel_to_freq(36), 5180);
        assert_eq!(channel_to_freq(0), 0);
        assert_eq!(channel_to_freq(200), 0);
    }
}
