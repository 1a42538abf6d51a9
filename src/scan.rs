//! Scanning: trigger, fetch, and parse the wireless event stream.
//!
//! Scan results come back as a packed stream of `iw_event` records, each a
//! 4-byte header (length, opcode) followed by an opcode-specific payload. A
//! new cell starts at each access-point address event; every other event
//! attaches to the cell most recently started. Point-typed payloads are
//! serialized without their userspace pointer: length, flags, then data.

use std::time::Duration;

use tracing::debug;

use crate::error::{Result, WextError};
use crate::flags::*;
use crate::params::{
    decode_essid, Frequency, HwAddr, IwFreq, IwParam, LinkQuality, WirelessMode,
};

#[cfg(target_os = "linux")]
use crate::transport::{IoctlSocket, IwReq};

/// Encryption state of a scanned cell, as far as the beacon reveals it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncryptionState {
    Disabled,
    /// Encryption on, key not disclosed (the normal case for foreign cells).
    EnabledNoKey,
    EnabledKey(Vec<u8>),
}

/// One cell from a scan, assembled from its event run.
///
/// Every field except the address is optional: drivers only emit the events
/// they have data for.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessPoint {
    pub bssid: HwAddr,
    pub essid: Option<String>,
    pub mode: Option<WirelessMode>,
    pub frequency: Option<Frequency>,
    pub quality: Option<LinkQuality>,
    pub encryption: Option<EncryptionState>,
    /// Advertised bitrates in bits per second, in emission order.
    pub bitrates: Vec<i32>,
}

impl AccessPoint {
    fn new(bssid: HwAddr) -> Self {
        Self {
            bssid,
            essid: None,
            mode: None,
            frequency: None,
            quality: None,
            encryption: None,
            bitrates: Vec::new(),
        }
    }
}

const EVENT_HEADER: usize = 4;
/// Serialized iw_point prefix inside an event: length u16 + flags u16.
const POINT_PREFIX: usize = 4;

/// Parse a scan result buffer into cells, in kernel emission order.
pub fn parse_scan_buffer(buf: &[u8]) -> Result<Vec<AccessPoint>> {
    let mut cells: Vec<AccessPoint> = Vec::new();
    let mut pos = 0usize;

    while pos < buf.len() {
        if pos + EVENT_HEADER > buf.len() {
            return Err(WextError::corrupt(
                "scan event stream",
                format!("{} trailing bytes, header needs {}", buf.len() - pos, EVENT_HEADER),
            ));
        }
        let len = u16::from_ne_bytes([buf[pos], buf[pos + 1]]) as usize;
        let cmd = u16::from_ne_bytes([buf[pos + 2], buf[pos + 3]]) as u32;
        if len < EVENT_HEADER {
            return Err(WextError::corrupt(
                "scan event stream",
                format!("event length {} shorter than its header", len),
            ));
        }
        if pos + len > buf.len() {
            return Err(WextError::corrupt(
                "scan event stream",
                format!(
                    "event of {} bytes at offset {} overruns {} byte buffer",
                    len,
                    pos,
                    buf.len()
                ),
            ));
        }
        let payload = &buf[pos + EVENT_HEADER..pos + len];

        if cmd == SIOCGIWAP {
            cells.push(AccessPoint::new(HwAddr::from_sockaddr(payload)?));
        } else if let Some(cell) = cells.last_mut() {
            attach_event(cell, cmd, payload)?;
        } else {
            // Events before the first cell boundary carry no usable record.
            debug!(cmd, "scan event before first cell, skipped");
        }
        pos += len;
    }

    Ok(cells)
}

fn attach_event(cell: &mut AccessPoint, cmd: u32, payload: &[u8]) -> Result<()> {
    match cmd {
        SIOCGIWFREQ => {
            cell.frequency = Some(IwFreq::from_bytes(payload)?.interpret());
        }
        SIOCGIWMODE => {
            if payload.len() < 4 {
                return Err(WextError::corrupt(
                    "scan mode event",
                    format!("{} bytes, need 4", payload.len()),
                ));
            }
            let raw = u32::from_ne_bytes([payload[0], payload[1], payload[2], payload[3]]);
            cell.mode = Some(WirelessMode::from_u32(raw)?);
        }
        IWEVQUAL => {
            cell.quality = Some(LinkQuality::from_bytes(payload)?);
        }
        SIOCGIWESSID => {
            let (_, data) = split_point(payload, "scan essid event")?;
            cell.essid = Some(decode_essid(data));
        }
        SIOCGIWENCODE => {
            let (flags, data) = split_point(payload, "scan encryption event")?;
            cell.encryption = Some(if flags & IW_ENCODE_DISABLED != 0 {
                EncryptionState::Disabled
            } else if data.is_empty() || flags & IW_ENCODE_NOKEY != 0 {
                EncryptionState::EnabledNoKey
            } else {
                EncryptionState::EnabledKey(data.to_vec())
            });
        }
        SIOCGIWRATE => {
            // Drivers pack several iw_param images back to back.
            if payload.len() % IwParam::SIZE != 0 {
                return Err(WextError::corrupt(
                    "scan bitrate event",
                    format!("{} bytes is not a multiple of {}", payload.len(), IwParam::SIZE),
                ));
            }
            for chunk in payload.chunks_exact(IwParam::SIZE) {
                cell.bitrates.push(IwParam::from_bytes(chunk)?.value);
            }
        }
        other => {
            debug!(cmd = other, "unhandled scan event, skipped");
        }
    }
    Ok(())
}

/// Split a serialized point payload into its flags word and data slice.
fn split_point<'a>(payload: &'a [u8], what: &'static str) -> Result<(u16, &'a [u8])> {
    if payload.len() < POINT_PREFIX {
        return Err(WextError::corrupt(
            what,
            format!("{} bytes, point prefix needs {}", payload.len(), POINT_PREFIX),
        ));
    }
    let length = u16::from_ne_bytes([payload[0], payload[1]]) as usize;
    let flags = u16::from_ne_bytes([payload[2], payload[3]]);
    let data = &payload[POINT_PREFIX..];
    if length > data.len() {
        return Err(WextError::corrupt(
            what,
            format!("declared {} data bytes, only {} present", length, data.len()),
        ));
    }
    Ok((flags, &data[..length]))
}

/// How long and how often to poll for scan completion.
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            attempts: 10,
            interval: Duration::from_millis(500),
        }
    }
}

/// Poll a fetch closure until it stops reporting `NotReady`.
///
/// Sleeps `interval` between attempts and gives up with `ScanTimedOut` after
/// `attempts` rounds. Any error other than `NotReady` propagates immediately.
pub fn poll_scan<F>(interface: &str, policy: &PollPolicy, mut fetch: F) -> Result<Vec<AccessPoint>>
where
    F: FnMut() -> Result<Vec<AccessPoint>>,
{
    for attempt in 0..policy.attempts {
        match fetch() {
            Ok(cells) => {
                debug!(interface, attempt, cells = cells.len(), "scan results ready");
                return Ok(cells);
            }
            Err(err) if err.is_retryable() => {
                debug!(interface, attempt, "scan results pending");
                std::thread::sleep(policy.interval);
            }
            Err(err) => return Err(err),
        }
    }
    Err(WextError::ScanTimedOut {
        interface: interface.to_string(),
        attempts: policy.attempts,
    })
}

/// Kick off a scan without waiting for it.
#[cfg(target_os = "linux")]
pub(crate) fn trigger_scan(socket: &IoctlSocket, interface: &str) -> Result<()> {
    let mut req = IwReq::new(interface)?;
    req.set_point(std::ptr::null_mut(), 0, IW_SCAN_DEFAULT);
    socket.request(interface, SIOCSIWSCAN, "trigger scan", &mut req)
}

/// Fetch whatever results the kernel has, growing the buffer on demand.
///
/// `NotReady` propagates to the caller; the buffer doubles on each
/// too-small report, capped by the `iw_point` 16-bit length field.
#[cfg(target_os = "linux")]
pub(crate) fn fetch_scan_results(socket: &IoctlSocket, interface: &str) -> Result<Vec<AccessPoint>> {
    let mut size = IW_SCAN_MAX_DATA;
    loop {
        let mut buf = vec![0u8; size];
        let mut req = IwReq::new(interface)?;
        req.set_point(buf.as_mut_ptr(), buf.len() as u16, 0);
        match socket.request(interface, SIOCGIWSCAN, "fetch scan results", &mut req) {
            Ok(()) => {
                let written = req.point_len() as usize;
                if written > buf.len() {
                    return Err(WextError::corrupt(
                        "scan results",
                        format!("kernel claims {} bytes in a {} byte buffer", written, buf.len()),
                    ));
                }
                return parse_scan_buffer(&buf[..written]);
            }
            Err(WextError::ArgumentTooLarge { .. }) if size < u16::MAX as usize => {
                size = (size * 2).min(u16::MAX as usize);
                debug!(interface, size, "scan buffer too small, growing");
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stream {
        buf: Vec<u8>,
    }

    impl Stream {
        fn new() -> Self {
            Self { buf: Vec::new() }
        }

        fn event(&mut self, cmd: u32, payload: &[u8]) -> &mut Self {
            let len = (EVENT_HEADER + payload.len()) as u16;
            self.buf.extend_from_slice(&len.to_ne_bytes());
            self.buf.extend_from_slice(&(cmd as u16).to_ne_bytes());
            self.buf.extend_from_slice(payload);
            self
        }

        fn point_event(&mut self, cmd: u32, flags: u16, data: &[u8]) -> &mut Self {
            let mut payload = Vec::new();
            payload.extend_from_slice(&(data.len() as u16).to_ne_bytes());
            payload.extend_from_slice(&flags.to_ne_bytes());
            payload.extend_from_slice(data);
            self.event(cmd, &payload)
        }

        fn ap(&mut self, addr: HwAddr) -> &mut Self {
            self.event(SIOCGIWAP, &addr.to_sockaddr())
        }
    }

    fn param_bytes(value: i32) -> [u8; 8] {
        IwParam {
            value,
            fixed: false,
            disabled: false,
            flags: 0,
        }
        .to_bytes()
    }

    #[test]
    fn two_cells_with_attributed_events() {
        let a = HwAddr([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
        let b = HwAddr([0x66, 0x77, 0x88, 0x99, 0xAA, 0xBB]);
        let mut s = Stream::new();
        s.ap(a)
            .point_event(SIOCGIWESSID, 1, b"first-net")
            .event(SIOCGIWMODE, &IW_MODE_MASTER.to_ne_bytes())
            .event(SIOCGIWFREQ, &IwFreq::from_hz(2_412_000_000.0).to_bytes())
            .event(IWEVQUAL, &[60, 190, 156, IW_QUAL_ALL_UPDATED])
            .point_event(SIOCGIWENCODE, IW_ENCODE_NOKEY, &[])
            .ap(b)
            .point_event(SIOCGIWESSID, 1, b"second-net")
            .point_event(SIOCGIWENCODE, IW_ENCODE_DISABLED, &[]);

        let mut rates = Vec::new();
        rates.extend_from_slice(&param_bytes(1_000_000));
        rates.extend_from_slice(&param_bytes(54_000_000));
        s.event(SIOCGIWRATE, &rates);

        let cells = parse_scan_buffer(&s.buf).unwrap();
        assert_eq!(cells.len(), 2);

        assert_eq!(cells[0].bssid, a);
        assert_eq!(cells[0].essid.as_deref(), Some("first-net"));
        assert_eq!(cells[0].mode, Some(WirelessMode::Master));
        assert_eq!(cells[0].frequency, Some(Frequency::Hz(2_412_000_000.0)));
        assert_eq!(cells[0].quality.unwrap().quality, 60);
        assert_eq!(cells[0].encryption, Some(EncryptionState::EnabledNoKey));
        assert!(cells[0].bitrates.is_empty());

        // Rates emitted after the second boundary belong to the second cell.
        assert_eq!(cells[1].bssid, b);
        assert_eq!(cells[1].essid.as_deref(), Some("second-net"));
        assert_eq!(cells[1].encryption, Some(EncryptionState::Disabled));
        assert_eq!(cells[1].bitrates, vec![1_000_000, 54_000_000]);
    }

    #[test]
    fn empty_buffer_is_zero_cells() {
        assert!(parse_scan_buffer(&[]).unwrap().is_empty());
    }

    #[test]
    fn events_before_first_cell_are_skipped() {
        let mut s = Stream::new();
        s.point_event(SIOCGIWESSID, 1, b"orphan")
            .ap(HwAddr([1, 2, 3, 4, 5, 6]));
        let cells = parse_scan_buffer(&s.buf).unwrap();
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].essid, None);
    }

    #[test]
    fn unknown_events_are_skipped() {
        let mut s = Stream::new();
        s.ap(HwAddr([1, 2, 3, 4, 5, 6]))
            .point_event(IWEVGENIE, 0, &[0xDD, 0x05, 0x00, 0x50, 0xF2, 0x01, 0x01])
            .point_event(SIOCGIWESSID, 1, b"net");
        let cells = parse_scan_buffer(&s.buf).unwrap();
        assert_eq!(cells[0].essid.as_deref(), Some("net"));
    }

    #[test]
    fn truncated_event_is_corrupt() {
        let mut s = Stream::new();
        s.ap(HwAddr([1, 2, 3, 4, 5, 6]));
        // Header claims more bytes than remain.
        s.buf.extend_from_slice(&100u16.to_ne_bytes());
        s.buf
            .extend_from_slice(&(SIOCGIWESSID as u16).to_ne_bytes());
        assert!(matches!(
            parse_scan_buffer(&s.buf),
            Err(WextError::CorruptResponse { .. })
        ));
    }

    #[test]
    fn undersized_event_length_is_corrupt() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&2u16.to_ne_bytes());
        buf.extend_from_slice(&(SIOCGIWAP as u16).to_ne_bytes());
        assert!(matches!(
            parse_scan_buffer(&buf),
            Err(WextError::CorruptResponse { .. })
        ));
    }

    #[test]
    fn point_length_beyond_payload_is_corrupt() {
        let mut s = Stream::new();
        s.ap(HwAddr([1, 2, 3, 4, 5, 6]));
        // Point prefix declares 50 data bytes but carries 3.
        let mut payload = Vec::new();
        payload.extend_from_slice(&50u16.to_ne_bytes());
        payload.extend_from_slice(&0u16.to_ne_bytes());
        payload.extend_from_slice(b"abc");
        s.event(SIOCGIWESSID, &payload);
        assert!(matches!(
            parse_scan_buffer(&s.buf),
            Err(WextError::CorruptResponse { .. })
        ));
    }

    #[test]
    fn ragged_bitrate_payload_is_corrupt() {
        let mut s = Stream::new();
        s.ap(HwAddr([1, 2, 3, 4, 5, 6]));
        s.event(SIOCGIWRATE, &[0u8; 12]);
        assert!(matches!(
            parse_scan_buffer(&s.buf),
            Err(WextError::CorruptResponse { .. })
        ));
    }

    #[test]
    fn encryption_key_disclosed() {
        let mut s = Stream::new();
        s.ap(HwAddr([1, 2, 3, 4, 5, 6]))
            .point_event(SIOCGIWENCODE, 0, &[0xAB, 0xCD, 0xEF, 0x01, 0x23]);
        let cells = parse_scan_buffer(&s.buf).unwrap();
        assert_eq!(
            cells[0].encryption,
            Some(EncryptionState::EnabledKey(vec![0xAB, 0xCD, 0xEF, 0x01, 0x23]))
        );
    }

    #[test]
    fn empty_essid_is_distinct_from_absent() {
        let mut s = Stream::new();
        s.ap(HwAddr([1, 2, 3, 4, 5, 6]))
            .point_event(SIOCGIWESSID, 0, &[]);
        let cells = parse_scan_buffer(&s.buf).unwrap();
        assert_eq!(cells[0].essid.as_deref(), Some(""));
    }

    #[test]
    fn poll_returns_first_ready_result() {
        let policy = PollPolicy {
            attempts: 5,
            interval: Duration::ZERO,
        };
        let mut calls = 0;
        let result = poll_scan("wlan0", &policy, || {
            calls += 1;
            if calls < 3 {
                Err(WextError::NotReady {
                    interface: "wlan0".to_string(),
                    operation: "fetch scan results",
                })
            } else {
                Ok(vec![AccessPoint::new(HwAddr::ZERO)])
            }
        })
        .unwrap();
        assert_eq!(calls, 3);
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn poll_gives_up_after_attempts() {
        let policy = PollPolicy {
            attempts: 4,
            interval: Duration::ZERO,
        };
        let mut calls = 0;
        let err = poll_scan("wlan0", &policy, || {
            calls += 1;
            Err(WextError::NotReady {
                interface: "wlan0".to_string(),
                operation: "fetch scan results",
            })
        })
        .unwrap_err();
        assert_eq!(calls, 4);
        assert!(matches!(err, WextError::ScanTimedOut { attempts: 4, .. }));
    }

    #[test]
    fn poll_propagates_hard_errors() {
        let policy = PollPolicy::default();
        let err = poll_scan("wlan0", &policy, || {
            Err(WextError::Unsupported {
                interface: "wlan0".to_string(),
                operation: "fetch scan results",
            })
        })
        .unwrap_err();
        assert!(matches!(err, WextError::Unsupported { .. }));
    }
}
