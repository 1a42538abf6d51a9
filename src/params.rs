//! Per-parameter encode/decode of the fixed-size Wireless Extensions
//! structures.
//!
//! Each kernel structure (`iw_param`, `iw_freq`, `iw_quality`, the sockaddr
//! hardware address, and the flag words carried by `iw_point` payloads) gets a
//! wire image with explicit `from_bytes`/`to_bytes`, plus a fully-typed record
//! decoded from it in one step. Decoded records carry every flag bit as a
//! named field so call sites never re-inspect raw masks.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, WextError};
use crate::flags::*;

/// Frequencies below this magnitude are channel indices, not Hz.
pub const CHANNEL_THRESHOLD: f64 = 1000.0;

/// Wire image of `struct iw_param` (8 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IwParam {
    pub value: i32,
    pub fixed: bool,
    pub disabled: bool,
    pub flags: u16,
}

impl IwParam {
    pub const SIZE: usize = 8;

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(WextError::corrupt(
                "iw_param",
                format!("{} bytes, need {}", bytes.len(), Self::SIZE),
            ));
        }
        Ok(Self {
            value: i32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            fixed: bytes[4] != 0,
            disabled: bytes[5] != 0,
            flags: u16::from_ne_bytes([bytes[6], bytes[7]]),
        })
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let value = self.value.to_ne_bytes();
        let flags = self.flags.to_ne_bytes();
        [
            value[0],
            value[1],
            value[2],
            value[3],
            self.fixed as u8,
            self.disabled as u8,
            flags[0],
            flags[1],
        ]
    }
}

/// Wire image of `struct iw_freq` (8 bytes): value = mantissa * 10^exponent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IwFreq {
    pub mantissa: i32,
    pub exponent: i16,
    /// Channel table index when the driver reports one, 0 otherwise.
    pub index: u8,
    pub flags: u8,
}

impl IwFreq {
    pub const SIZE: usize = 8;

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(WextError::corrupt(
                "iw_freq",
                format!("{} bytes, need {}", bytes.len(), Self::SIZE),
            ));
        }
        Ok(Self {
            mantissa: i32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            exponent: i16::from_ne_bytes([bytes[4], bytes[5]]),
            index: bytes[6],
            flags: bytes[7],
        })
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mantissa = self.mantissa.to_ne_bytes();
        let exponent = self.exponent.to_ne_bytes();
        [
            mantissa[0],
            mantissa[1],
            mantissa[2],
            mantissa[3],
            exponent[0],
            exponent[1],
            self.index,
            self.flags,
        ]
    }

    /// Build a frequency in Hz, normalizing the mantissa into i32 range.
    pub fn from_hz(hz: f64) -> Self {
        let mut mantissa = hz;
        let mut exponent: i16 = 0;
        while mantissa >= 1e9 {
            mantissa /= 10.0;
            exponent += 1;
        }
        Self {
            mantissa: mantissa as i32,
            exponent,
            index: 0,
            flags: IW_FREQ_FIXED,
        }
    }

    /// Build a channel-index request.
    pub fn from_channel(channel: i32) -> Self {
        Self {
            mantissa: channel,
            exponent: 0,
            index: 0,
            flags: IW_FREQ_FIXED,
        }
    }

    pub fn value(&self) -> f64 {
        self.mantissa as f64 * 10f64.powi(self.exponent as i32)
    }

    pub fn is_fixed(&self) -> bool {
        self.flags & IW_FREQ_FIXED != 0
    }

    /// Disambiguate channel index vs. raw frequency by magnitude.
    pub fn interpret(&self) -> Frequency {
        let value = self.value();
        if value < CHANNEL_THRESHOLD {
            // The exponent applies to channel encodings too.
            Frequency::Channel(value as i32)
        } else {
            Frequency::Hz(value)
        }
    }
}

/// A decoded frequency field: either a channel index or a frequency in Hz.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Frequency {
    Channel(i32),
    Hz(f64),
}

/// Wireless operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WirelessMode {
    Auto,
    AdHoc,
    Managed,
    Master,
    Repeater,
    Secondary,
    Monitor,
    Mesh,
}

impl WirelessMode {
    pub fn from_u32(raw: u32) -> Result<Self> {
        match raw {
            IW_MODE_AUTO => Ok(Self::Auto),
            IW_MODE_ADHOC => Ok(Self::AdHoc),
            IW_MODE_INFRA => Ok(Self::Managed),
            IW_MODE_MASTER => Ok(Self::Master),
            IW_MODE_REPEAT => Ok(Self::Repeater),
            IW_MODE_SECOND => Ok(Self::Secondary),
            IW_MODE_MONITOR => Ok(Self::Monitor),
            IW_MODE_MESH => Ok(Self::Mesh),
            other => Err(WextError::corrupt(
                "operating mode",
                format!("unknown mode value {}", other),
            )),
        }
    }

    pub fn as_u32(&self) -> u32 {
        match self {
            Self::Auto => IW_MODE_AUTO,
            Self::AdHoc => IW_MODE_ADHOC,
            Self::Managed => IW_MODE_INFRA,
            Self::Master => IW_MODE_MASTER,
            Self::Repeater => IW_MODE_REPEAT,
            Self::Secondary => IW_MODE_SECOND,
            Self::Monitor => IW_MODE_MONITOR,
            Self::Mesh => IW_MODE_MESH,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Auto => "Auto",
            Self::AdHoc => "Ad-Hoc",
            Self::Managed => "Managed",
            Self::Master => "Master",
            Self::Repeater => "Repeater",
            Self::Secondary => "Secondary",
            Self::Monitor => "Monitor",
            Self::Mesh => "Mesh",
        }
    }
}

impl fmt::Display for WirelessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 6-byte hardware address (BSSID / access-point address).
///
/// An all-zero address is a valid decode result; callers decide whether to
/// present it as "not associated".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HwAddr(pub [u8; 6]);

impl HwAddr {
    pub const ZERO: HwAddr = HwAddr([0; 6]);
    pub const BROADCAST: HwAddr = HwAddr([0xFF; 6]);

    const SOCKADDR_LEN: usize = 16;
    const ARPHRD_ETHER: u16 = 1;

    pub fn is_zero(&self) -> bool {
        self.0 == [0; 6]
    }

    /// Decode from a kernel `struct sockaddr` image (family + sa_data).
    pub fn from_sockaddr(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 8 {
            return Err(WextError::corrupt(
                "hardware address",
                format!("sockaddr of {} bytes, need at least 8", bytes.len()),
            ));
        }
        let mut addr = [0u8; 6];
        addr.copy_from_slice(&bytes[2..8]);
        Ok(Self(addr))
    }

    /// Encode as a `struct sockaddr` image with an Ethernet family tag.
    pub fn to_sockaddr(&self) -> [u8; Self::SOCKADDR_LEN] {
        let mut out = [0u8; Self::SOCKADDR_LEN];
        out[..2].copy_from_slice(&Self::ARPHRD_ETHER.to_ne_bytes());
        out[2..8].copy_from_slice(&self.0);
        out
    }
}

impl fmt::Display for HwAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl FromStr for HwAddr {
    type Err = WextError;

    fn from_str(s: &str) -> Result<Self> {
        let mut addr = [0u8; 6];
        let mut parts = 0;
        for (i, part) in s.split(':').enumerate() {
            if i >= 6 {
                parts = 7;
                break;
            }
            addr[i] = u8::from_str_radix(part, 16).map_err(|e| WextError::InvalidArgument {
                parameter: "hardware address",
                value: s.to_string(),
                reason: e.to_string(),
            })?;
            parts = i + 1;
        }
        if parts != 6 {
            return Err(WextError::InvalidArgument {
                parameter: "hardware address",
                value: s.to_string(),
                reason: "expected six colon-separated octets".to_string(),
            });
        }
        Ok(Self(addr))
    }
}

/// A decoded scalar parameter (bitrate, tx-power, sensitivity, RTS threshold,
/// fragmentation threshold).
///
/// `fixed` reflects the driver's bit exactly, never an inference from the
/// value. When `disabled` is set the numeric value is not meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parameter {
    pub value: i32,
    pub fixed: bool,
    pub disabled: bool,
}

impl Parameter {
    pub fn from_wire(raw: &IwParam) -> Self {
        Self {
            value: raw.value,
            fixed: raw.fixed,
            disabled: raw.disabled,
        }
    }
}

/// Decoded retry parameter preserving the full modifier combination.
///
/// The kernel can set several of these bits at once (e.g. min + limit); all
/// of them are surfaced so the presentation layer can pick its own label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryInfo {
    pub value: i32,
    pub fixed: bool,
    pub disabled: bool,
    pub limit: bool,
    pub lifetime: bool,
    pub min: bool,
    pub max: bool,
    pub short: bool,
    pub long: bool,
}

impl RetryInfo {
    pub fn from_wire(raw: &IwParam) -> Self {
        Self {
            value: raw.value,
            fixed: raw.fixed,
            disabled: raw.disabled,
            limit: raw.flags & IW_RETRY_LIMIT != 0,
            lifetime: raw.flags & IW_RETRY_LIFETIME != 0,
            min: raw.flags & IW_RETRY_MIN != 0,
            max: raw.flags & IW_RETRY_MAX != 0,
            short: raw.flags & IW_RETRY_SHORT != 0,
            long: raw.flags & IW_RETRY_LONG != 0,
        }
    }
}

/// Which quantity a power-management value expresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerKind {
    Period,
    Timeout,
    Saving,
}

/// Receive/send filtering mode for power management.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerMode {
    UnicastOnly,
    MulticastOnly,
    AllReceived,
    ForceSending,
    RepeatMulticast,
}

/// Decoded power-management parameter.
///
/// The quantity axis (`kind`, `min`, `max`) and the filtering-mode axis
/// (`mode`) are independent and decoded separately. The quantity axis is only
/// populated when the type field is non-zero, and timeout takes precedence
/// over saving over period, matching the observed driver convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerInfo {
    pub disabled: bool,
    pub value: i32,
    pub fixed: bool,
    pub kind: Option<PowerKind>,
    pub min: bool,
    pub max: bool,
    pub mode: Option<PowerMode>,
}

impl PowerInfo {
    pub fn from_wire(raw: &IwParam) -> Self {
        if raw.disabled {
            return Self {
                disabled: true,
                value: raw.value,
                fixed: raw.fixed,
                kind: None,
                min: false,
                max: false,
                mode: None,
            };
        }
        let mut kind = None;
        let mut min = false;
        let mut max = false;
        if raw.flags & IW_POWER_TYPE != 0 {
            min = raw.flags & IW_POWER_MIN != 0;
            max = raw.flags & IW_POWER_MAX != 0;
            kind = Some(if raw.flags & IW_POWER_TIMEOUT != 0 {
                PowerKind::Timeout
            } else if raw.flags & IW_POWER_SAVING != 0 {
                PowerKind::Saving
            } else {
                PowerKind::Period
            });
        }
        let mode = match raw.flags & IW_POWER_MODE {
            IW_POWER_UNICAST_R => Some(PowerMode::UnicastOnly),
            IW_POWER_MULTICAST_R => Some(PowerMode::MulticastOnly),
            IW_POWER_ALL_R => Some(PowerMode::AllReceived),
            IW_POWER_FORCE_S => Some(PowerMode::ForceSending),
            IW_POWER_REPEATER => Some(PowerMode::RepeatMulticast),
            _ => None,
        };
        Self {
            disabled: false,
            value: raw.value,
            fixed: raw.fixed,
            kind,
            min,
            max,
            mode,
        }
    }
}

/// Security mode for an encryption key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityMode {
    Restricted,
    Open,
}

impl SecurityMode {
    /// Decode from the encoding flags word. When both bits are set the
    /// restricted bit takes precedence (first-checked wins).
    pub fn from_flags(flags: u16) -> Option<Self> {
        if flags & IW_ENCODE_RESTRICTED != 0 {
            Some(Self::Restricted)
        } else if flags & IW_ENCODE_OPEN != 0 {
            Some(Self::Open)
        } else {
            None
        }
    }
}

/// Decoded encryption key and flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionInfo {
    /// Key material; empty when the driver withheld it or none is set.
    pub key: Vec<u8>,
    pub disabled: bool,
    /// The driver reported encryption state without disclosing the key.
    pub no_key: bool,
    /// Explicit key slot, only when the masked index exceeds 1.
    pub index: Option<u8>,
    pub mode: Option<SecurityMode>,
}

impl EncryptionInfo {
    pub fn from_point(flags: u16, data: &[u8]) -> Self {
        Self {
            key: data.to_vec(),
            disabled: flags & IW_ENCODE_DISABLED != 0,
            no_key: flags & IW_ENCODE_NOKEY != 0,
            index: key_index(flags),
            mode: SecurityMode::from_flags(flags),
        }
    }
}

/// Wire image of `struct iw_quality` (4 bytes) with the updated byte decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkQuality {
    pub quality: u8,
    pub level: u8,
    pub noise: u8,
    pub quality_updated: bool,
    pub level_updated: bool,
    pub noise_updated: bool,
    /// Raw updated byte; also carries the invalid/dBm/RCPI bits.
    pub updated: u8,
}

impl LinkQuality {
    pub const SIZE: usize = 4;

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(WextError::corrupt(
                "iw_quality",
                format!("{} bytes, need {}", bytes.len(), Self::SIZE),
            ));
        }
        let updated = bytes[3];
        Ok(Self {
            quality: bytes[0],
            level: bytes[1],
            noise: bytes[2],
            quality_updated: updated & IW_QUAL_QUAL_UPDATED != 0,
            level_updated: updated & IW_QUAL_LEVEL_UPDATED != 0,
            noise_updated: updated & IW_QUAL_NOISE_UPDATED != 0,
            updated,
        })
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        [self.quality, self.level, self.noise, self.updated]
    }

    /// Signal level in dBm under the common 8-bit driver encoding.
    pub fn level_dbm(&self) -> i16 {
        self.level as i16 - 0x100
    }

    /// Noise level in dBm under the common 8-bit driver encoding.
    pub fn noise_dbm(&self) -> i16 {
        self.noise as i16 - 0x100
    }
}

/// Decode an ESSID payload: trailing NULs trimmed, lossy UTF-8.
pub fn decode_essid(data: &[u8]) -> String {
    let end = data
        .iter()
        .rposition(|&b| b != 0)
        .map(|i| i + 1)
        .unwrap_or(0);
    String::from_utf8_lossy(&data[..end]).into_owned()
}
