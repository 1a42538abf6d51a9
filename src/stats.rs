//! Live link statistics: decoding `struct iw_statistics`.

use crate::error::{Result, WextError};
use crate::params::LinkQuality;

#[cfg(target_os = "linux")]
use crate::flags::SIOCGIWSTATS;
#[cfg(target_os = "linux")]
use crate::transport::{IoctlSocket, IwReq};

/// Packet discard counters, grouped by cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscardCounters {
    /// Wrong network id / ESSID.
    pub nwid: u32,
    /// Unable to decrypt.
    pub code: u32,
    /// Failed fragment reassembly.
    pub fragment: u32,
    /// Maximum MAC retries reached.
    pub retries: u32,
    pub misc: u32,
}

/// Decoded `iw_statistics` image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkStatistics {
    pub status: u16,
    pub quality: LinkQuality,
    pub discard: DiscardCounters,
    pub missed_beacons: u32,
}

impl LinkStatistics {
    /// status u16 (+2 padding), iw_quality, 5 discard counters, missed.
    pub const SIZE: usize = 32;

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(WextError::corrupt(
                "iw_statistics",
                format!("{} bytes, need {}", bytes.len(), Self::SIZE),
            ));
        }
        let u32_at = |off: usize| {
            u32::from_ne_bytes([bytes[off], bytes[off + 1], bytes[off + 2], bytes[off + 3]])
        };
        Ok(Self {
            status: u16::from_ne_bytes([bytes[0], bytes[1]]),
            quality: LinkQuality::from_bytes(&bytes[2..6])?,
            discard: DiscardCounters {
                nwid: u32_at(8),
                code: u32_at(12),
                fragment: u32_at(16),
                retries: u32_at(20),
                misc: u32_at(24),
            },
            missed_beacons: u32_at(28),
        })
    }
}

/// Fetch statistics for an interface.
///
/// A driver with nothing to report yet (never associated) answers `EAGAIN`;
/// that reads as `NoStatisticsYet` rather than a retryable condition.
#[cfg(target_os = "linux")]
pub(crate) fn fetch_statistics(socket: &IoctlSocket, interface: &str) -> Result<LinkStatistics> {
    let mut buf = [0u8; LinkStatistics::SIZE];
    let mut req = IwReq::new(interface)?;
    // flags=1 requests a cleared update-flags snapshot, as the tools do.
    req.set_point(buf.as_mut_ptr(), buf.len() as u16, 1);
    match socket.request(interface, SIOCGIWSTATS, "get statistics", &mut req) {
        Ok(()) => LinkStatistics::from_bytes(&buf),
        Err(WextError::NotReady { .. }) => Err(WextError::NoStatisticsYet {
            interface: interface.to_string(),
        }),
        Err(err) => Err(err),
    }
}
