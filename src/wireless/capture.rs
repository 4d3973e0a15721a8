//! Wireless Packet Capture
//!
//! The [`Radio`] capability is the seam between the capture pipeline and the
//! actual hardware: start/stop promiscuous capture with a classifier, retune,
//! and enumerate the networks visible on a channel. The one production
//! implementation drives a monitor-mode interface through pcap; tests use the
//! mock in [`crate::testing`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, warn};

use super::ieee80211::{parse_beacon, FrameControl, MacAddr, ManagementSubtype, ADDR3_OFFSET, MGMT_HEADER_LEN};
use super::interface::{InterfaceMode, WirelessError, WirelessInterface};
use super::radiotap::parse_radiotap;
use crate::detect::classifier::{FrameClassifier, FrameMeta};

/// Capture errors
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("interface error: {0}")]
    Interface(#[from] WirelessError),

    #[error("pcap error: {0}")]
    Pcap(String),

    #[error("unsupported link type {0} (need radiotap or raw 802.11)")]
    UnsupportedLinkType(i32),

    #[error("capture thread panicked")]
    ThreadPanicked,
}

/// A network seen during a channel scan
#[derive(Debug, Clone)]
pub struct ScannedNetwork {
    pub ssid: String,
    pub bssid: MacAddr,
    pub channel: u8,
    pub signal_dbm: Option<i8>,
}

/// Handle for a running capture, returned by [`Radio::start_capture`].
///
/// Stopping the capture gives the classifier back so a later restart can
/// reuse it with its ring producer intact.
pub struct CaptureHandle {
    running: Arc<AtomicBool>,
    thread: JoinHandle<FrameClassifier>,
}

impl CaptureHandle {
    pub(crate) fn new(running: Arc<AtomicBool>, thread: JoinHandle<FrameClassifier>) -> Self {
        Self { running, thread }
    }

    /// Signal the capture thread and join it, recovering the classifier.
    pub fn stop(self) -> Result<FrameClassifier, CaptureError> {
        self.running.store(false, Ordering::SeqCst);
        self.thread.join().map_err(|_| CaptureError::ThreadPanicked)
    }
}

/// Radio capability: what the capture pipeline needs from the hardware
pub trait Radio {
    /// Register the classifier and begin promiscuous capture.
    fn start_capture(&mut self, classifier: FrameClassifier) -> Result<CaptureHandle, CaptureError>;

    /// Stop a running capture, returning the classifier for reuse.
    fn stop_capture(&mut self, handle: CaptureHandle) -> Result<FrameClassifier, CaptureError> {
        handle.stop()
    }

    /// Retune to a channel.
    fn set_channel(&mut self, channel: u8) -> Result<(), CaptureError>;

    /// Channel the radio is currently tuned to, if known.
    fn current_channel(&self) -> Option<u8>;

    /// Listen on one channel for `dwell` and report the networks seen.
    fn scan_channel(&mut self, channel: u8, dwell: Duration) -> Result<Vec<ScannedNetwork>, CaptureError>;
}

/// Capture configuration for the pcap-backed radio
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Interface name
    pub interface: String,
    /// Capture buffer size in bytes
    pub buffer_size: usize,
    /// Promiscuous mode (true for monitor-mode capture)
    pub promiscuous: bool,
    /// Immediate mode (lower latency)
    pub immediate: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            interface: String::new(),
            buffer_size: 65536,
            promiscuous: true,
            immediate: true,
        }
    }
}

impl CaptureConfig {
    pub fn for_interface(name: &str) -> Self {
        Self {
            interface: name.to_string(),
            ..Default::default()
        }
    }
}

/// pcap read timeout; bounds how long the capture thread can miss the
/// shutdown flag.
const READ_TIMEOUT_MS: i32 = 100;

/// Monitor-mode radio implemented over pcap and nl80211
pub struct PcapRadio {
    interface: WirelessInterface,
    config: CaptureConfig,
    /// Channel hint shared with the capture thread, for drivers whose
    /// radiotap headers omit the channel field.
    channel_hint: Arc<AtomicU8>,
}

impl PcapRadio {
    /// Open the interface, switching it to monitor mode if needed.
    pub fn new(config: CaptureConfig) -> Result<Self, CaptureError> {
        let mut interface = WirelessInterface::get(&config.interface)?;

        if !interface.is_monitor_mode() {
            interface.set_mode(InterfaceMode::Monitor)?;
        }

        let channel_hint = Arc::new(AtomicU8::new(interface.channel.unwrap_or(0)));

        Ok(Self {
            interface,
            config,
            channel_hint,
        })
    }

    fn open_pcap(&self) -> Result<(pcap::Capture<pcap::Active>, bool), CaptureError> {
        let cap = pcap::Capture::from_device(self.config.interface.as_str())
            .map_err(|e| CaptureError::Pcap(e.to_string()))?
            .promisc(self.config.promiscuous)
            .immediate_mode(self.config.immediate)
            .buffer_size(self.config.buffer_size as i32)
            .timeout(READ_TIMEOUT_MS)
            .open()
            .map_err(|e| CaptureError::Pcap(e.to_string()))?;

        // 127 = radiotap, 105 = raw 802.11 without a preamble
        let linktype = cap.get_datalink();
        let has_radiotap = match linktype.0 {
            127 => true,
            105 => false,
            other => return Err(CaptureError::UnsupportedLinkType(other)),
        };

        Ok((cap, has_radiotap))
    }
}

impl Radio for PcapRadio {
    fn start_capture(&mut self, classifier: FrameClassifier) -> Result<CaptureHandle, CaptureError> {
        let (mut cap, has_radiotap) = self.open_pcap()?;

        let running = Arc::new(AtomicBool::new(true));
        let thread_running = Arc::clone(&running);
        let channel_hint = Arc::clone(&self.channel_hint);

        let thread = std::thread::spawn(move || {
            while thread_running.load(Ordering::SeqCst) {
                match cap.next_packet() {
                    Ok(packet) => {
                        let hint = channel_hint.load(Ordering::Relaxed);
                        if has_radiotap {
                            if let Some((info, offset)) = parse_radiotap(packet.data) {
                                let meta = FrameMeta {
                                    channel: info.channel().unwrap_or(hint),
                                    rssi: info.signal_dbm.unwrap_or(0),
                                };
                                classifier.classify(&packet.data[offset..], meta);
                            }
                        } else {
                            let meta = FrameMeta {
                                channel: hint,
                                rssi: 0,
                            };
                            classifier.classify(packet.data, meta);
                        }
                    }
                    Err(pcap::Error::TimeoutExpired) => {
                        // Normal timeout; re-check the running flag
                    }
                    Err(e) => {
                        warn!("capture read error: {}", e);
                    }
                }
            }
            classifier
        });

        debug!("capture started on {}", self.config.interface);
        Ok(CaptureHandle::new(running, thread))
    }

    fn set_channel(&mut self, channel: u8) -> Result<(), CaptureError> {
        self.interface.set_channel(channel)?;
        self.channel_hint.store(channel, Ordering::Relaxed);
        Ok(())
    }

    fn current_channel(&self) -> Option<u8> {
        self.interface.channel
    }

    fn scan_channel(&mut self, channel: u8, dwell: Duration) -> Result<Vec<ScannedNetwork>, CaptureError> {
        self.set_channel(channel)?;

        let (mut cap, has_radiotap) = self.open_pcap()?;
        let mut seen: HashMap<MacAddr, ScannedNetwork> = HashMap::new();
        let deadline = Instant::now() + dwell;

        while Instant::now() < deadline {
            let packet = match cap.next_packet() {
                Ok(p) => p,
                Err(pcap::Error::TimeoutExpired) => continue,
                Err(e) => {
                    warn!("scan read error on channel {}: {}", channel, e);
                    break;
                }
            };

            let (signal, frame) = if has_radiotap {
                match parse_radiotap(packet.data) {
                    Some((info, offset)) => (info.signal_dbm, &packet.data[offset..]),
                    None => continue,
                }
            } else {
                (None, packet.data)
            };

            if let Some(network) = scan_frame(frame, signal, channel) {
                seen.entry(network.bssid).or_insert(network);
            }
        }

        Ok(seen.into_values().collect())
    }
}

/// Turn one frame seen during a scan into a network entry: beacons and
/// probe responses only, BSSID from addr3, SSID and channel from the body.
fn scan_frame(frame: &[u8], signal: Option<i8>, fallback_channel: u8) -> Option<ScannedNetwork> {
    let fc = FrameControl::parse(frame)?;
    if !fc.is_management() {
        return None;
    }
    let beacon_like = matches!(
        fc.management_subtype(),
        ManagementSubtype::Beacon | ManagementSubtype::ProbeResponse
    );
    if !beacon_like || frame.len() < MGMT_HEADER_LEN {
        return None;
    }

    let bssid = MacAddr::from_slice(&frame[ADDR3_OFFSET..])?;
    let info = parse_beacon(&frame[MGMT_HEADER_LEN..])?;

    Some(ScannedNetwork {
        ssid: info.ssid,
        bssid,
        channel: info.channel.unwrap_or(fallback_channel),
        signal_dbm: signal,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{beacon_frame, deauth_frame};

    #[test]
    fn test_scan_frame_reads_beacons() {
        let frame = beacon_frame([0xaa; 6], "Home", 6);
        let network = scan_frame(&frame, Some(-50), 1).unwrap();
        assert_eq!(network.ssid, "Home");
        assert_eq!(network.bssid, MacAddr::new([0xaa; 6]));
        assert_eq!(network.channel, 6);
        assert_eq!(network.signal_dbm, Some(-50));
    }

    #[test]
    fn test_scan_frame_ignores_other_management() {
        let frame = deauth_frame([0x11; 6], [0x22; 6]);
        assert!(scan_frame(&frame, None, 1).is_none());
    }

    #[test]
    fn test_scan_frame_falls_back_to_scan_channel() {
        // beacon with no DS parameter element
        let mut frame = beacon_frame([0xaa; 6], "Home", 6);
        frame.truncate(frame.len() - 3);
        let network = scan_frame(&frame, None, 11).unwrap();
        assert_eq!(network.channel, 11);
    }
}
