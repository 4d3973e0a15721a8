//! Synthetic Frames and a Scripted Radio
//!
//! Test doubles shared by the unit tests and the integration tests:
//! builders for raw 802.11 management frames and a [`Radio`] whose channels
//! and visible networks are scripted up front.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::detect::classifier::FrameClassifier;
use crate::wireless::capture::{CaptureError, CaptureHandle, Radio, ScannedNetwork};
use crate::wireless::ieee80211::MacAddr;

/// Build a raw deauthentication frame: frame control, duration, addr1
/// (broadcast receiver), addr2 (transmitter), addr3 (BSSID), sequence
/// control, reason code.
pub fn deauth_frame(transmitter: [u8; 6], bssid: [u8; 6]) -> Vec<u8> {
    let mut frame = vec![0xc0, 0x00, 0x3a, 0x01];
    frame.extend_from_slice(&[0xff; 6]); // addr1
    frame.extend_from_slice(&transmitter); // addr2
    frame.extend_from_slice(&bssid); // addr3
    frame.extend_from_slice(&[0x00, 0x00]); // seq control
    frame.extend_from_slice(&[0x07, 0x00]); // reason: class 3 frame from nonassociated STA
    frame
}

/// Build a minimal beacon frame body-included frame for scan-path tests.
pub fn beacon_frame(bssid: [u8; 6], ssid: &str, channel: u8) -> Vec<u8> {
    let mut frame = vec![0x80, 0x00, 0x00, 0x00];
    frame.extend_from_slice(&[0xff; 6]); // addr1
    frame.extend_from_slice(&bssid); // addr2
    frame.extend_from_slice(&bssid); // addr3
    frame.extend_from_slice(&[0x00, 0x00]); // seq control
    frame.extend_from_slice(&[0u8; 12]); // timestamp + interval + capabilities
    frame.push(0x00); // SSID element
    frame.push(ssid.len() as u8);
    frame.extend_from_slice(ssid.as_bytes());
    frame.extend_from_slice(&[0x03, 0x01, channel]); // DS parameter
    frame
}

/// A network the mock radio should "see" on a given channel
#[derive(Debug, Clone)]
pub struct MockNetwork {
    pub ssid: String,
    pub bssid: [u8; 6],
    pub channel: u8,
    pub signal_dbm: i8,
}

/// Scripted [`Radio`]: scan results are configured per channel, tuning is
/// recorded, and "capture" is a thread that idles until stopped.
#[derive(Default)]
pub struct MockRadio {
    networks: HashMap<u8, Vec<MockNetwork>>,
    /// Every channel ever passed to [`Radio::set_channel`], in order
    pub tuned: Vec<u8>,
    current: Option<u8>,
    capturing: bool,
}

impl MockRadio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `network` visible when scanning its channel
    pub fn add_network(&mut self, network: MockNetwork) {
        self.networks.entry(network.channel).or_default().push(network);
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing
    }
}

impl Radio for MockRadio {
    fn start_capture(&mut self, classifier: FrameClassifier) -> Result<CaptureHandle, CaptureError> {
        self.capturing = true;
        let running = Arc::new(AtomicBool::new(true));
        let thread_running = Arc::clone(&running);
        let thread = std::thread::spawn(move || {
            while thread_running.load(Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(1));
            }
            classifier
        });
        Ok(CaptureHandle::new(running, thread))
    }

    fn stop_capture(&mut self, handle: CaptureHandle) -> Result<FrameClassifier, CaptureError> {
        self.capturing = false;
        handle.stop()
    }

    fn set_channel(&mut self, channel: u8) -> Result<(), CaptureError> {
        self.tuned.push(channel);
        self.current = Some(channel);
        Ok(())
    }

    fn current_channel(&self) -> Option<u8> {
        self.current
    }

    fn scan_channel(&mut self, channel: u8, _dwell: Duration) -> Result<Vec<ScannedNetwork>, CaptureError> {
        self.set_channel(channel)?;
        Ok(self
            .networks
            .get(&channel)
            .map(|nets| {
                nets.iter()
                    .map(|n| ScannedNetwork {
                        ssid: n.ssid.clone(),
                        bssid: MacAddr::new(n.bssid),
                        channel: n.channel,
                        signal_dbm: Some(n.signal_dbm),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}
