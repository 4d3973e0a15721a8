//! Session Event Store
//!
//! The ordered list of finalized deauth events for the current session —
//! append-only while monitoring, truncated only by an explicit clear after a
//! reporting attempt or operator action. Also answers the read-only queries
//! the presentation layer asks for.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::detect::discovery::ChannelMap;

/// Sentinel SSID for access points the discovery cache has never seen
pub const UNKNOWN_SSID: &str = "unknown";

/// A finalized deauthentication event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeauthEvent {
    /// Capture time
    pub timestamp: DateTime<Utc>,
    /// Resolved network name, or [`UNKNOWN_SSID`]
    pub target_ssid: String,
    /// Access point address, canonical text form
    pub target_bssid: String,
    /// Transmitter address, canonical text form
    pub attacker_mac: String,
    /// Channel the frame was captured on
    pub channel: u8,
    /// Receive signal strength in dBm
    pub rssi: i8,
    /// Running count for this access point since the last clear
    pub packet_count: u32,
}

/// Per-session event list with presentation queries
#[derive(Debug, Default)]
pub struct SessionStore {
    events: Vec<DeauthEvent>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a finalized event. Only the event processor calls this.
    pub fn push(&mut self, event: DeauthEvent) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Full event list, in arrival order
    pub fn events(&self) -> &[DeauthEvent] {
        &self.events
    }

    /// Owned copy of the event list for the reporting cycle
    pub fn snapshot(&self) -> Vec<DeauthEvent> {
        self.events.clone()
    }

    /// Truncate the session. The caller is responsible for resetting the
    /// per-transmitter counters in the same breath.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Events recorded for a monitored name this session
    pub fn count_for_ssid(&self, ssid: &str) -> usize {
        self.events.iter().filter(|e| e.target_ssid == ssid).count()
    }

    /// Most recent event for a monitored name
    pub fn last_event_for_ssid(&self, ssid: &str) -> Option<&DeauthEvent> {
        self.events.iter().rev().find(|e| e.target_ssid == ssid)
    }

    /// Channel a name resolves to: the discovery map first, then the most
    /// recent event that carried a usable channel.
    pub fn channel_for_ssid(&self, ssid: &str, map: &ChannelMap) -> Option<u8> {
        if let Some(ch) = map.channel_for(ssid) {
            return Some(ch);
        }
        self.events
            .iter()
            .rev()
            .find(|e| e.target_ssid == ssid && e.channel > 0)
            .map(|e| e.channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(ssid: &str, channel: u8, count: u32) -> DeauthEvent {
        DeauthEvent {
            timestamp: Utc::now(),
            target_ssid: ssid.to_string(),
            target_bssid: "AA:BB:CC:DD:EE:FF".to_string(),
            attacker_mac: "11:22:33:44:55:66".to_string(),
            channel,
            rssi: -55,
            packet_count: count,
        }
    }

    #[test]
    fn test_append_and_queries() {
        let mut store = SessionStore::new();
        store.push(event("Home", 6, 1));
        store.push(event("Lab", 11, 1));
        store.push(event("Home", 6, 2));

        assert_eq!(store.len(), 3);
        assert_eq!(store.count_for_ssid("Home"), 2);
        assert_eq!(store.count_for_ssid("Lab"), 1);
        assert_eq!(store.count_for_ssid("Other"), 0);
        assert_eq!(store.last_event_for_ssid("Home").unwrap().packet_count, 2);
    }

    #[test]
    fn test_clear_empties_the_list() {
        let mut store = SessionStore::new();
        store.push(event("Home", 6, 1));
        store.clear();
        assert!(store.is_empty());
        assert!(store.last_event_for_ssid("Home").is_none());
    }

    #[test]
    fn test_channel_falls_back_to_events() {
        let mut store = SessionStore::new();
        let map = ChannelMap::default();

        // nothing known at all
        assert_eq!(store.channel_for_ssid("Home", &map), None);

        // channel 0 events cannot answer the query
        store.push(event("Home", 0, 1));
        assert_eq!(store.channel_for_ssid("Home", &map), None);

        store.push(event("Home", 6, 2));
        assert_eq!(store.channel_for_ssid("Home", &map), Some(6));
    }
}
