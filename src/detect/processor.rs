//! Event Processor
//!
//! Control-loop half of the capture pipeline: drains the ring under a
//! bounded-wait lock, applies per-access-point threshold suppression,
//! resolves addresses to network names, and appends finalized events to the
//! session store and log sink.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::detect::discovery::AddressNameCache;
use crate::detect::ring::{DrainOutcome, RingConsumer};
use crate::eventlog::EventSink;
use crate::session::{DeauthEvent, SessionStore, UNKNOWN_SSID};
use crate::wireless::ieee80211::MacAddr;

/// Default bound on the wait for the drain lock
pub const DRAIN_LOCK_WAIT: Duration = Duration::from_millis(10);

/// Running per-access-point packet counts, reset with the session.
///
/// Owned by the event processor and touched only on the control loop; the
/// capture callback never sees it.
#[derive(Debug, Default)]
pub struct TransmitterCounters {
    counts: HashMap<MacAddr, u32>,
}

impl TransmitterCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a capture against `ap`. Returns the new running count, or None
    /// when the threshold was already reached — in that case nothing changes
    /// and the capture must be discarded.
    pub fn observe(&mut self, ap: MacAddr, threshold: u32) -> Option<u32> {
        let count = self.counts.entry(ap).or_insert(0);
        if *count >= threshold {
            return None;
        }
        *count += 1;
        Some(*count)
    }

    pub fn count(&self, ap: &MacAddr) -> u32 {
        self.counts.get(ap).copied().unwrap_or(0)
    }

    /// Forget everything; part of the session clear.
    pub fn reset(&mut self) {
        self.counts.clear();
    }
}

/// Drains raw captures into finalized session events
pub struct EventProcessor {
    consumer: RingConsumer,
    counters: TransmitterCounters,
    /// Max events per access point between clears
    threshold: u32,
    lock_wait: Duration,
}

impl EventProcessor {
    pub fn new(consumer: RingConsumer, threshold: u32) -> Self {
        Self {
            consumer,
            counters: TransmitterCounters::new(),
            threshold,
            lock_wait: DRAIN_LOCK_WAIT,
        }
    }

    /// One control-loop drain pass.
    ///
    /// Cheap when the ring is empty (cursor compare, no lock). A lock
    /// timeout consumes nothing and is retried next iteration. Sink failures
    /// are logged and do not stop the drain.
    pub fn drain(
        &mut self,
        cache: &AddressNameCache,
        store: &mut SessionStore,
        sink: &mut dyn EventSink,
    ) -> DrainOutcome {
        let counters = &mut self.counters;
        let threshold = self.threshold;

        self.consumer.drain(self.lock_wait, |capture| {
            let ap = MacAddr::new(capture.ap);

            let Some(packet_count) = counters.observe(ap, threshold) else {
                // threshold reached for this AP; drop silently until the
                // counters are reset
                return;
            };

            let transmitter = MacAddr::new(capture.transmitter);
            let ssid = cache.resolve(&ap).unwrap_or(UNKNOWN_SSID);
            let timestamp =
                DateTime::<Utc>::from_timestamp(capture.timestamp, 0).unwrap_or_else(Utc::now);

            let event = DeauthEvent {
                timestamp,
                target_ssid: ssid.to_string(),
                target_bssid: ap.to_string(),
                attacker_mac: transmitter.to_string(),
                channel: capture.channel,
                rssi: capture.rssi,
                packet_count,
            };

            debug!(
                "deauth detected: bssid={} sender={} ch={} rssi={}",
                event.target_bssid, event.attacker_mac, event.channel, event.rssi
            );

            if let Err(e) = sink.record(&event) {
                warn!("session log write failed: {}", e);
            }

            store.push(event);
        })
    }

    /// Reset the per-access-point counters; part of the session clear.
    pub fn reset_counters(&mut self) {
        self.counters.reset();
    }

    /// Captures the producer discarded because the ring was full
    pub fn ring_dropped(&self) -> u64 {
        self.consumer.dropped()
    }
}
