//! Driver capability report: decoding `struct iw_range`.
//!
//! The kernel hands back one large fixed-layout C struct describing
//! everything the driver supports. The decode walks the byte image with a
//! cursor that re-applies C alignment before each field, so the offsets stay
//! correct without a table of magic numbers. Counts that exceed their array
//! capacity, and capability claims with empty backing sequences, are
//! corruption, not data.

use crate::error::{Result, WextError};
use crate::flags::*;
use crate::params::{IwFreq, LinkQuality};

#[cfg(target_os = "linux")]
use crate::transport::{IoctlSocket, IwReq};

/// Cursor over a kernel struct image that aligns like the C compiler does:
/// each primitive is read at the next offset aligned to its own size.
struct CStructCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> CStructCursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn align(&mut self, to: usize) {
        let rem = self.pos % to;
        if rem != 0 {
            self.pos += to - rem;
        }
    }

    fn take(&mut self, n: usize, what: &'static str) -> Result<&'a [u8]> {
        if self.pos + n > self.buf.len() {
            return Err(WextError::corrupt(
                what,
                format!(
                    "need {} bytes at offset {}, only {} in buffer",
                    n,
                    self.pos,
                    self.buf.len()
                ),
            ));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u8(&mut self, what: &'static str) -> Result<u8> {
        Ok(self.take(1, what)?[0])
    }

    fn u16(&mut self, what: &'static str) -> Result<u16> {
        self.align(2);
        let b = self.take(2, what)?;
        Ok(u16::from_ne_bytes([b[0], b[1]]))
    }

    fn u32(&mut self, what: &'static str) -> Result<u32> {
        self.align(4);
        let b = self.take(4, what)?;
        Ok(u32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn i32(&mut self, what: &'static str) -> Result<i32> {
        self.align(4);
        let b = self.take(4, what)?;
        Ok(i32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn quality(&mut self, what: &'static str) -> Result<LinkQuality> {
        LinkQuality::from_bytes(self.take(LinkQuality::SIZE, what)?)
    }

    fn freq(&mut self, what: &'static str) -> Result<IwFreq> {
        self.align(4);
        IwFreq::from_bytes(self.take(IwFreq::SIZE, what)?)
    }
}

/// One entry of the driver's channel table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelFrequency {
    pub channel: i32,
    pub hz: f64,
}

/// Decoded driver capability report.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeInfo {
    pub throughput: u32,
    pub scan_capa: u8,
    pub event_capa: [u32; 6],
    pub sensitivity: i32,
    pub max_quality: LinkQuality,
    pub avg_quality: LinkQuality,
    /// Supported bitrates in bits per second, in driver order.
    pub bitrates: Vec<i32>,
    pub min_rts: i32,
    pub max_rts: i32,
    pub min_frag: i32,
    pub max_frag: i32,
    pub min_pm_period: i32,
    pub max_pm_period: i32,
    pub min_pm_timeout: i32,
    pub max_pm_timeout: i32,
    pub pm_period_flags: u16,
    pub pm_timeout_flags: u16,
    pub pm_capa: u16,
    /// Accepted key sizes in bytes.
    pub encoding_sizes: Vec<u16>,
    /// Number of key slots the driver exposes.
    pub max_encoding_tokens: u8,
    pub encoding_login_index: u8,
    pub txpower_capa: u16,
    pub txpowers: Vec<i32>,
    pub we_version_compiled: u8,
    pub we_version_source: u8,
    pub retry_capa: u16,
    pub retry_flags: u16,
    pub retry_lifetime_flags: u16,
    pub min_retry: i32,
    pub max_retry: i32,
    pub min_retry_lifetime: i32,
    pub max_retry_lifetime: i32,
    /// Regulatory channel count; may exceed the entries actually listed.
    pub num_channels: u16,
    pub frequencies: Vec<ChannelFrequency>,
    pub enc_capa: u32,
}

impl RangeInfo {
    /// Decode the `iw_range` image in declared field order.
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        let mut c = CStructCursor::new(buf);

        let throughput = c.u32("range throughput")?;
        let _min_nwid = c.u32("range nwid bounds")?;
        let _max_nwid = c.u32("range nwid bounds")?;
        let _old_num_channels = c.u16("range legacy channel count")?;
        let _old_num_frequency = c.u8("range legacy frequency count")?;
        let scan_capa = c.u8("range scan capabilities")?;
        let mut event_capa = [0u32; 6];
        for slot in &mut event_capa {
            *slot = c.u32("range event capabilities")?;
        }
        let sensitivity = c.i32("range sensitivity")?;
        let max_quality = c.quality("range max quality")?;
        let avg_quality = c.quality("range avg quality")?;

        let num_bitrates = c.u8("range bitrate count")? as usize;
        if num_bitrates > IW_MAX_BITRATES {
            return Err(WextError::corrupt(
                "range bitrate count",
                format!("{} exceeds capacity {}", num_bitrates, IW_MAX_BITRATES),
            ));
        }
        let mut bitrates = Vec::with_capacity(IW_MAX_BITRATES);
        for _ in 0..IW_MAX_BITRATES {
            bitrates.push(c.i32("range bitrates")?);
        }
        bitrates.truncate(num_bitrates);

        let min_rts = c.i32("range rts bounds")?;
        let max_rts = c.i32("range rts bounds")?;
        let min_frag = c.i32("range frag bounds")?;
        let max_frag = c.i32("range frag bounds")?;

        let min_pm_period = c.i32("range power bounds")?;
        let max_pm_period = c.i32("range power bounds")?;
        let min_pm_timeout = c.i32("range power bounds")?;
        let max_pm_timeout = c.i32("range power bounds")?;
        let pm_period_flags = c.u16("range power flags")?;
        let pm_timeout_flags = c.u16("range power flags")?;
        let pm_capa = c.u16("range power capabilities")?;

        let mut encoding_sizes = Vec::with_capacity(IW_MAX_ENCODING_SIZES);
        for _ in 0..IW_MAX_ENCODING_SIZES {
            encoding_sizes.push(c.u16("range encoding sizes")?);
        }
        let num_encoding_sizes = c.u8("range encoding size count")? as usize;
        if num_encoding_sizes > IW_MAX_ENCODING_SIZES {
            return Err(WextError::corrupt(
                "range encoding size count",
                format!(
                    "{} exceeds capacity {}",
                    num_encoding_sizes, IW_MAX_ENCODING_SIZES
                ),
            ));
        }
        encoding_sizes.truncate(num_encoding_sizes);
        let max_encoding_tokens = c.u8("range encoding token count")?;
        let encoding_login_index = c.u8("range encoding login index")?;

        let txpower_capa = c.u16("range txpower capabilities")?;
        let num_txpower = c.u8("range txpower count")? as usize;
        if num_txpower > IW_MAX_TXPOWER {
            return Err(WextError::corrupt(
                "range txpower count",
                format!("{} exceeds capacity {}", num_txpower, IW_MAX_TXPOWER),
            ));
        }
        let mut txpowers = Vec::with_capacity(IW_MAX_TXPOWER);
        for _ in 0..IW_MAX_TXPOWER {
            txpowers.push(c.i32("range txpower values")?);
        }
        txpowers.truncate(num_txpower);

        let we_version_compiled = c.u8("range we version")?;
        let we_version_source = c.u8("range we version")?;
        let retry_capa = c.u16("range retry capabilities")?;
        let retry_flags = c.u16("range retry flags")?;
        let retry_lifetime_flags = c.u16("range retry flags")?;
        let min_retry = c.i32("range retry bounds")?;
        let max_retry = c.i32("range retry bounds")?;
        let min_retry_lifetime = c.i32("range retry bounds")?;
        let max_retry_lifetime = c.i32("range retry bounds")?;

        let num_channels = c.u16("range channel count")?;
        let num_frequency = c.u8("range frequency count")? as usize;
        if num_frequency > IW_MAX_FREQUENCIES {
            return Err(WextError::corrupt(
                "range frequency count",
                format!("{} exceeds capacity {}", num_frequency, IW_MAX_FREQUENCIES),
            ));
        }
        let mut frequencies = Vec::with_capacity(num_frequency);
        for i in 0..IW_MAX_FREQUENCIES {
            let raw = c.freq("range frequency table")?;
            if i < num_frequency {
                frequencies.push(ChannelFrequency {
                    channel: raw.index as i32,
                    hz: raw.value(),
                });
            }
        }
        let enc_capa = c.u32("range encryption capabilities")?;

        // A driver that advertises key slots must say which key sizes it
        // takes; same for tx-power levels.
        if max_encoding_tokens > 0 && encoding_sizes.is_empty() {
            return Err(WextError::corrupt(
                "range encoding capabilities",
                format!(
                    "{} key slots advertised but no accepted key sizes",
                    max_encoding_tokens
                ),
            ));
        }
        if txpower_capa != 0 && txpowers.is_empty() {
            return Err(WextError::corrupt(
                "range txpower capabilities",
                format!(
                    "capability flags {:#06x} advertised but no txpower values",
                    txpower_capa
                ),
            ));
        }

        Ok(Self {
            throughput,
            scan_capa,
            event_capa,
            sensitivity,
            max_quality,
            avg_quality,
            bitrates,
            min_rts,
            max_rts,
            min_frag,
            max_frag,
            min_pm_period,
            max_pm_period,
            min_pm_timeout,
            max_pm_timeout,
            pm_period_flags,
            pm_timeout_flags,
            pm_capa,
            encoding_sizes,
            max_encoding_tokens,
            encoding_login_index,
            txpower_capa,
            txpowers,
            we_version_compiled,
            we_version_source,
            retry_capa,
            retry_flags,
            retry_lifetime_flags,
            min_retry,
            max_retry,
            min_retry_lifetime,
            max_retry_lifetime,
            num_channels,
            frequencies,
            enc_capa,
        })
    }

    /// Highest bitrate the driver lists, if any.
    pub fn max_bitrate(&self) -> Option<i32> {
        self.bitrates.iter().copied().max()
    }
}

/// Fetch and decode the capability report for an interface.
#[cfg(target_os = "linux")]
pub(crate) fn fetch_range(socket: &IoctlSocket, interface: &str) -> Result<RangeInfo> {
    // Generously sized: iw_range is 568 bytes on 64-bit kernels and the
    // kernel writes back the true length.
    let mut buf = vec![0u8; 1024];
    let mut req = IwReq::new(interface)?;
    req.set_point(buf.as_mut_ptr(), buf.len() as u16, 0);
    socket.request(interface, SIOCGIWRANGE, "get range", &mut req)?;
    let written = req.point_len() as usize;
    if written > buf.len() {
        return Err(WextError::corrupt(
            "range report",
            format!("kernel claims {} bytes in a {} byte buffer", written, buf.len()),
        ));
    }
    RangeInfo::from_bytes(&buf[..written])
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Mirror of the decode cursor: writes fields at C-aligned offsets so
    /// the tests build images the same way the compiler lays them out.
    struct Image {
        buf: Vec<u8>,
    }

    impl Image {
        fn new() -> Self {
            Self { buf: Vec::new() }
        }

        fn align(&mut self, to: usize) {
            while self.buf.len() % to != 0 {
                self.buf.push(0);
            }
        }

        fn u8(&mut self, v: u8) -> &mut Self {
            self.buf.push(v);
            self
        }

        fn u16(&mut self, v: u16) -> &mut Self {
            self.align(2);
            self.buf.extend_from_slice(&v.to_ne_bytes());
            self
        }

        fn u32(&mut self, v: u32) -> &mut Self {
            self.align(4);
            self.buf.extend_from_slice(&v.to_ne_bytes());
            self
        }

        fn i32(&mut self, v: i32) -> &mut Self {
            self.align(4);
            self.buf.extend_from_slice(&v.to_ne_bytes());
            self
        }

        fn bytes(&mut self, v: &[u8]) -> &mut Self {
            self.buf.extend_from_slice(v);
            self
        }
    }

    fn sample_image(
        num_bitrates: u8,
        num_encoding_sizes: u8,
        max_encoding_tokens: u8,
        num_txpower: u8,
        num_frequency: u8,
    ) -> Vec<u8> {
        let mut img = Image::new();
        img.u32(1_000_000); // throughput
        img.u32(0).u32(0); // nwid bounds
        img.u16(14).u8(14).u8(0x01); // legacy counts, scan_capa
        for _ in 0..6 {
            img.u32(0); // event_capa
        }
        img.i32(-89); // sensitivity
        img.bytes(&[70, 0, 0, 0]); // max_qual
        img.bytes(&[35, 0, 0, 0]); // avg_qual
        img.u8(num_bitrates);
        for i in 0..IW_MAX_BITRATES {
            img.i32(if i < num_bitrates as usize {
                (i as i32 + 1) * 1_000_000
            } else {
                0
            });
        }
        img.i32(0).i32(2347); // rts bounds
        img.i32(256).i32(2346); // frag bounds
        img.i32(0).i32(65_535_000).i32(0).i32(65_535_000); // pm bounds
        img.u16(IW_POWER_PERIOD).u16(IW_POWER_TIMEOUT).u16(0x0F00); // pm flags/capa
        for i in 0..IW_MAX_ENCODING_SIZES {
            img.u16(if i == 0 { 5 } else if i == 1 { 13 } else { 0 });
        }
        img.u8(num_encoding_sizes)
            .u8(max_encoding_tokens)
            .u8(0); // login index
        img.u16(IW_TXPOW_DBM | IW_TXPOW_MWATT); // txpower_capa
        img.u8(num_txpower);
        for i in 0..IW_MAX_TXPOWER {
            img.i32(if i < num_txpower as usize { 20 - i as i32 } else { 0 });
        }
        img.u8(22).u8(22); // we versions
        img.u16(0).u16(IW_RETRY_LIMIT).u16(IW_RETRY_LIFETIME); // retry capa/flags
        img.i32(0).i32(255).i32(0).i32(512_000); // retry bounds
        img.u16(14); // num_channels
        img.u8(num_frequency);
        for i in 0..IW_MAX_FREQUENCIES {
            // iw_freq: mantissa i32, exponent i16, index u8, flags u8
            if i < num_frequency as usize {
                img.i32(2412 + 5 * i as i32);
                img.u16(6u16); // exponent 6: value in MHz units
                img.u8(i as u8 + 1).u8(0);
            } else {
                img.i32(0);
                img.u16(0);
                img.u8(0).u8(0);
            }
        }
        img.u32(0x0000_0011); // enc_capa
        img.buf
    }

    #[test]
    fn decodes_a_complete_report() {
        let buf = sample_image(4, 2, 4, 3, 2);
        let range = RangeInfo::from_bytes(&buf).unwrap();
        assert_eq!(range.sensitivity, -89);
        assert_eq!(range.max_quality.quality, 70);
        assert_eq!(range.bitrates, vec![1_000_000, 2_000_000, 3_000_000, 4_000_000]);
        assert_eq!(range.max_bitrate(), Some(4_000_000));
        assert_eq!(range.encoding_sizes, vec![5, 13]);
        assert_eq!(range.max_encoding_tokens, 4);
        assert_eq!(range.txpowers, vec![20, 19, 18]);
        assert_eq!(range.we_version_compiled, 22);
        assert_eq!(range.num_channels, 14);
        assert_eq!(range.frequencies.len(), 2);
        assert_eq!(range.frequencies[0].channel, 1);
        assert!((range.frequencies[0].hz - 2_412_000_000.0).abs() < 1e3);
        assert!((range.frequencies[1].hz - 2_417_000_000.0).abs() < 1e3);
        assert_eq!(range.max_rts, 2347);
        assert_eq!(range.max_frag, 2346);
        assert_eq!(range.min_retry, 0);
        assert_eq!(range.max_retry, 255);
        assert_eq!(range.enc_capa, 0x11);
    }

    #[test]
    fn count_over_capacity_is_corrupt() {
        let mut buf = sample_image(4, 2, 4, 3, 2);
        // bitrate count byte sits right after the two quality structs
        let idx = buf
            .windows(4)
            .position(|w| w == [70, 0, 0, 0])
            .unwrap()
            + 8;
        assert_eq!(buf[idx], 4);
        buf[idx] = (IW_MAX_BITRATES + 1) as u8;
        assert!(matches!(
            RangeInfo::from_bytes(&buf),
            Err(WextError::CorruptResponse { .. })
        ));
    }

    #[test]
    fn truncated_report_is_corrupt() {
        let buf = sample_image(4, 2, 4, 3, 2);
        assert!(matches!(
            RangeInfo::from_bytes(&buf[..100]),
            Err(WextError::CorruptResponse { .. })
        ));
        assert!(matches!(
            RangeInfo::from_bytes(&[]),
            Err(WextError::CorruptResponse { .. })
        ));
    }

    #[test]
    fn key_slots_without_sizes_is_corrupt() {
        let buf = sample_image(4, 0, 4, 3, 2);
        assert!(matches!(
            RangeInfo::from_bytes(&buf),
            Err(WextError::CorruptResponse { .. })
        ));
    }

    #[test]
    fn txpower_capability_without_values_is_corrupt() {
        let buf = sample_image(4, 2, 4, 0, 2);
        assert!(matches!(
            RangeInfo::from_bytes(&buf),
            Err(WextError::CorruptResponse { .. })
        ));
    }

    #[test]
    fn no_encryption_support_decodes_cleanly() {
        let buf = sample_image(1, 0, 0, 1, 1);
        let range = RangeInfo::from_bytes(&buf).unwrap();
        assert!(range.encoding_sizes.is_empty());
        assert_eq!(range.max_encoding_tokens, 0);
    }
}
