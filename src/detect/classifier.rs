//! Interrupt-Context Frame Classifier
//!
//! Runs inside the radio's per-frame callback. Inspects the frame-control
//! bits of each management frame and, for deauthentication frames only,
//! copies the two relevant addresses plus receive metadata into the capture
//! ring. Everything here must stay allocation- and lock-free; a full ring
//! means the capture is dropped, never waited on.

use chrono::Utc;

use crate::detect::ring::{RawCapture, RingProducer};
use crate::wireless::ieee80211::{is_deauth, ADDR2_OFFSET, ADDR3_OFFSET, MGMT_ADDR_LEN};

/// Receive metadata the radio hands the classifier alongside each frame
#[derive(Debug, Clone, Copy)]
pub struct FrameMeta {
    /// Channel the radio was tuned to
    pub channel: u8,
    /// Signal strength in dBm
    pub rssi: i8,
}

/// Per-frame deauth classifier, owning the producer half of the ring.
///
/// Constructed once per monitoring session and moved into the capture
/// callback via [`Radio::start_capture`](crate::wireless::Radio); the radio
/// returns it when capture stops so a later restart can reuse it.
pub struct FrameClassifier {
    producer: RingProducer,
}

impl FrameClassifier {
    pub fn new(producer: RingProducer) -> Self {
        Self { producer }
    }

    /// Classify one frame (radiotap already stripped).
    ///
    /// Advances the ring head by at most one slot. Non-deauth frames,
    /// truncated frames, and a full ring all return without effect.
    pub fn classify(&self, frame: &[u8], meta: FrameMeta) {
        if frame.len() < MGMT_ADDR_LEN {
            return;
        }

        if !is_deauth(frame[0]) {
            return;
        }

        let mut transmitter = [0u8; 6];
        transmitter.copy_from_slice(&frame[ADDR2_OFFSET..ADDR2_OFFSET + 6]);
        let mut ap = [0u8; 6];
        ap.copy_from_slice(&frame[ADDR3_OFFSET..ADDR3_OFFSET + 6]);

        self.producer.push(RawCapture {
            transmitter,
            ap,
            channel: meta.channel,
            rssi: meta.rssi,
            timestamp: Utc::now().timestamp(),
        });
    }

    /// Captures dropped on the producer side since session start
    pub fn dropped(&self) -> u64 {
        self.producer.dropped()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::ring::capture_ring;
    use crate::testing::deauth_frame;
    use std::time::Duration;

    const META: FrameMeta = FrameMeta {
        channel: 6,
        rssi: -50,
    };

    #[test]
    fn test_deauth_frame_is_captured() {
        let (tx, rx) = capture_ring(8);
        let classifier = FrameClassifier::new(tx);

        let frame = deauth_frame([0x11; 6], [0x22; 6]);
        classifier.classify(&frame, META);

        let mut captures = Vec::new();
        rx.drain(Duration::from_millis(10), |c| captures.push(c));
        assert_eq!(captures.len(), 1);
        assert_eq!(captures[0].transmitter, [0x11; 6]);
        assert_eq!(captures[0].ap, [0x22; 6]);
        assert_eq!(captures[0].channel, 6);
        assert_eq!(captures[0].rssi, -50);
        assert!(captures[0].timestamp > 0);
    }

    #[test]
    fn test_non_deauth_frames_are_ignored() {
        let (tx, rx) = capture_ring(8);
        let classifier = FrameClassifier::new(tx);

        // beacon (subtype 8), data, and ack frames
        let mut beacon = deauth_frame([0x11; 6], [0x22; 6]);
        beacon[0] = 0x80;
        classifier.classify(&beacon, META);
        classifier.classify(&[0x08u8; 32], META);
        classifier.classify(&[0xd4u8, 0x00], META);

        assert!(rx.is_empty());
    }

    #[test]
    fn test_truncated_frame_is_ignored() {
        let (tx, rx) = capture_ring(8);
        let classifier = FrameClassifier::new(tx);

        classifier.classify(&[0xc0, 0x00, 0x00, 0x00], META);
        assert!(rx.is_empty());
    }

    #[test]
    fn test_full_ring_drops_without_error() {
        let (tx, rx) = capture_ring(4); // holds 3
        let classifier = FrameClassifier::new(tx);

        let frame = deauth_frame([0x11; 6], [0x22; 6]);
        for _ in 0..10 {
            classifier.classify(&frame, META);
        }

        assert_eq!(rx.len(), 3);
        assert_eq!(classifier.dropped(), 7);
    }
}
