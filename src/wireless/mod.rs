//! 802.11 Capture Plumbing
//!
//! Frame primitives, radiotap metadata extraction, nl80211 interface
//! control, and the pcap-backed [`Radio`] implementation.
//!
//! Requires a wireless interface capable of monitor mode for live capture.

pub mod capture;
pub mod ieee80211;
pub mod interface;
pub mod radiotap;

pub use capture::{CaptureConfig, CaptureError, CaptureHandle, PcapRadio, Radio, ScannedNetwork};
pub use ieee80211::{FrameControl, FrameType, MacAddr, ManagementSubtype};
pub use interface::{InterfaceMode, WirelessError, WirelessInterface};
pub use radiotap::{parse_radiotap, RadiotapInfo};
