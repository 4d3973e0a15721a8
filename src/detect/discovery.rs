//! Channel Discovery
//!
//! Before monitoring starts, the planner sweeps channels 1–14, notes the
//! access-point address of every visible network, and works out which
//! channels carry the monitored SSIDs. The result is the working channel set
//! the hop scheduler cycles through and the name/channel maps the event
//! processor resolves against.

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, warn};

use crate::wireless::capture::Radio;
use crate::wireless::ieee80211::MacAddr;

/// The 2.4 GHz channels swept during discovery
pub const ALL_CHANNELS: [u8; 14] = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14];

/// BSSID → SSID, built during discovery and read-only afterwards.
///
/// Every visible network is recorded, monitored or not; resolving attacker
/// frames against networks we merely saw in passing is free and makes event
/// names better. Entries outlive session clears.
#[derive(Debug, Default)]
pub struct AddressNameCache {
    map: HashMap<MacAddr, String>,
}

impl AddressNameCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, bssid: MacAddr, ssid: String) {
        self.map.insert(bssid, ssid);
    }

    pub fn resolve(&self, bssid: &MacAddr) -> Option<&str> {
        self.map.get(bssid).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Monitored SSID → channel, rebuilt wholesale on each discovery pass
#[derive(Debug, Default, Clone)]
pub struct ChannelMap {
    map: HashMap<String, u8>,
}

impl ChannelMap {
    pub fn channel_for(&self, ssid: &str) -> Option<u8> {
        self.map.get(ssid).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Result of a discovery pass
#[derive(Debug, Clone, Default)]
pub struct ChannelPlan {
    /// Deduplicated channels carrying monitored networks (or the fallback)
    pub working_set: Vec<u8>,
    /// Monitored SSID → channel it was found on
    pub channel_map: ChannelMap,
}

/// Sequential scan of all channels for the monitored network names
pub struct ChannelPlanner {
    monitored: Vec<String>,
    dwell: Duration,
    /// Fall back to every channel when no monitored SSID was found; the
    /// alternative is monitoring nothing until the next discovery.
    scan_all_when_none: bool,
}

impl ChannelPlanner {
    pub fn new(monitored: Vec<String>, dwell: Duration, scan_all_when_none: bool) -> Self {
        Self {
            monitored,
            dwell,
            scan_all_when_none,
        }
    }

    /// Sweep channels 1–14, populating `cache` with every network seen and
    /// returning the working set / channel map for the monitored names.
    ///
    /// A scan failure on one channel is logged and skipped; discovery keeps
    /// going with the remaining channels.
    pub fn discover<R: Radio>(&self, radio: &mut R, cache: &mut AddressNameCache) -> ChannelPlan {
        let mut plan = ChannelPlan::default();

        for &channel in &ALL_CHANNELS {
            let networks = match radio.scan_channel(channel, self.dwell) {
                Ok(n) => n,
                Err(e) => {
                    warn!("scan of channel {} failed: {}", channel, e);
                    continue;
                }
            };

            for network in networks {
                if !network.ssid.is_empty() {
                    cache.insert(network.bssid, network.ssid.clone());
                }

                if self.monitored.iter().any(|m| *m == network.ssid) {
                    debug!("found '{}' on channel {}", network.ssid, channel);
                    plan.channel_map.map.insert(network.ssid.clone(), channel);
                    if !plan.working_set.contains(&channel) {
                        plan.working_set.push(channel);
                    }
                }
            }
        }

        if plan.working_set.is_empty() {
            if self.scan_all_when_none {
                warn!("no monitored network found; falling back to all channels");
                plan.working_set = ALL_CHANNELS.to_vec();
            } else {
                warn!("no monitored network found; no channels to monitor");
            }
        } else {
            debug!("active channels: {:?}", plan.working_set);
        }

        plan
    }
}
