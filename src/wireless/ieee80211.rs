//! 802.11 Frame Primitives
//!
//! Frame-control decoding and the fixed management-header layout used by the
//! deauth classifier. Only the management subset this sensor cares about is
//! modeled; control and data frames are recognized and skipped.

/// Frame type field value for management frames (bits 3:2 of frame control).
pub const FRAME_TYPE_MANAGEMENT: u8 = 0;

/// Frame subtype field value for deauthentication (bits 7:4 of frame control).
pub const SUBTYPE_DEAUTHENTICATION: u8 = 0x0c;

/// Byte offsets into a management frame header (radiotap already stripped).
pub const ADDR1_OFFSET: usize = 4;
pub const ADDR2_OFFSET: usize = 10;
pub const ADDR3_OFFSET: usize = 16;

/// Minimum length covering frame control through addr3.
pub const MGMT_ADDR_LEN: usize = 22;

/// Full management header including sequence control.
pub const MGMT_HEADER_LEN: usize = 24;

/// MAC address (6 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddr([u8; 6]);

impl MacAddr {
    pub const BROADCAST: MacAddr = MacAddr([0xff, 0xff, 0xff, 0xff, 0xff, 0xff]);
    pub const ZERO: MacAddr = MacAddr([0, 0, 0, 0, 0, 0]);

    pub fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(data: &[u8]) -> Option<Self> {
        if data.len() >= 6 {
            let mut bytes = [0u8; 6];
            bytes.copy_from_slice(&data[..6]);
            Some(Self(bytes))
        } else {
            None
        }
    }

    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    pub fn is_broadcast(&self) -> bool {
        self.0 == [0xff, 0xff, 0xff, 0xff, 0xff, 0xff]
    }

    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }
}

impl std::fmt::Display for MacAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

/// Frame type (2 bits)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    Management = 0,
    Control = 1,
    Data = 2,
    Extension = 3,
}

impl From<u8> for FrameType {
    fn from(val: u8) -> Self {
        match val & 0x03 {
            0 => FrameType::Management,
            1 => FrameType::Control,
            2 => FrameType::Data,
            _ => FrameType::Extension,
        }
    }
}

/// Management frame subtype (4 bits)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagementSubtype {
    AssocRequest = 0x00,
    AssocResponse = 0x01,
    ReassocRequest = 0x02,
    ReassocResponse = 0x03,
    ProbeRequest = 0x04,
    ProbeResponse = 0x05,
    Beacon = 0x08,
    Atim = 0x09,
    Disassociation = 0x0a,
    Authentication = 0x0b,
    Deauthentication = 0x0c,
    Action = 0x0d,
    Unknown = 0xff,
}

impl ManagementSubtype {
    pub fn from_raw(subtype: u8) -> Self {
        match subtype & 0x0f {
            0 => ManagementSubtype::AssocRequest,
            1 => ManagementSubtype::AssocResponse,
            2 => ManagementSubtype::ReassocRequest,
            3 => ManagementSubtype::ReassocResponse,
            4 => ManagementSubtype::ProbeRequest,
            5 => ManagementSubtype::ProbeResponse,
            8 => ManagementSubtype::Beacon,
            9 => ManagementSubtype::Atim,
            10 => ManagementSubtype::Disassociation,
            11 => ManagementSubtype::Authentication,
            12 => ManagementSubtype::Deauthentication,
            13 => ManagementSubtype::Action,
            _ => ManagementSubtype::Unknown,
        }
    }
}

/// Frame control field (first 2 bytes of every 802.11 frame)
#[derive(Debug, Clone, Copy)]
pub struct FrameControl {
    pub protocol_version: u8,
    pub frame_type: FrameType,
    /// Raw 4-bit subtype, meaningful per frame type
    pub subtype: u8,
    pub to_ds: bool,
    pub from_ds: bool,
    pub retry: bool,
    pub protected: bool,
}

impl FrameControl {
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < 2 {
            return None;
        }

        let fc0 = data[0];
        let fc1 = data[1];

        Some(Self {
            protocol_version: fc0 & 0x03,
            frame_type: FrameType::from((fc0 >> 2) & 0x03),
            subtype: (fc0 >> 4) & 0x0f,
            to_ds: fc1 & 0x01 != 0,
            from_ds: fc1 & 0x02 != 0,
            retry: fc1 & 0x08 != 0,
            protected: fc1 & 0x40 != 0,
        })
    }

    pub fn is_management(&self) -> bool {
        self.frame_type == FrameType::Management
    }

    pub fn management_subtype(&self) -> ManagementSubtype {
        ManagementSubtype::from_raw(self.subtype)
    }
}

/// Deauth test on the first frame-control byte.
///
/// This is the branch that runs in the capture callback; the full
/// [`FrameControl`] parse is reserved for the scan path.
#[inline]
pub fn is_deauth(fc0: u8) -> bool {
    (fc0 >> 2) & 0x03 == FRAME_TYPE_MANAGEMENT && (fc0 >> 4) & 0x0f == SUBTYPE_DEAUTHENTICATION
}

/// Fields extracted from a beacon or probe response body during discovery
#[derive(Debug, Clone, Default)]
pub struct BeaconInfo {
    /// SSID from the first information element (empty if hidden)
    pub ssid: String,
    /// Channel from the DS Parameter Set element, if present
    pub channel: Option<u8>,
}

/// Parse the SSID and DS channel out of a beacon/probe-response body.
///
/// The body starts after the management header: 8 bytes timestamp, 2 bytes
/// beacon interval, 2 bytes capability info, then information elements.
pub fn parse_beacon(body: &[u8]) -> Option<BeaconInfo> {
    const FIXED_LEN: usize = 12;
    const IE_SSID: u8 = 0;
    const IE_DS_PARAMETER: u8 = 3;

    if body.len() < FIXED_LEN {
        return None;
    }

    let mut info = BeaconInfo::default();
    let mut pos = FIXED_LEN;

    while pos + 2 <= body.len() {
        let id = body[pos];
        let len = body[pos + 1] as usize;
        pos += 2;

        if pos + len > body.len() {
            break; // truncated element
        }

        match id {
            IE_SSID => {
                info.ssid = String::from_utf8_lossy(&body[pos..pos + len])
                    .trim_end_matches('\0')
                    .to_string();
            }
            IE_DS_PARAMETER if len >= 1 => {
                info.channel = Some(body[pos]);
            }
            _ => {}
        }

        pos += len;
    }

    Some(info)
}
