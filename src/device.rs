//! Per-interface operation surface.
//!
//! [`WirelessDevice`] names one interface and exposes every wireless ioctl
//! as a typed method. Each call opens its own datagram socket, issues the
//! ioctl, and decodes the answer; there is no cached state, so concurrent
//! callers only contend inside the kernel.

use tracing::info;

use crate::error::{Result, WextError};
use crate::flags::*;
use crate::params::{
    decode_essid, EncryptionInfo, Frequency, HwAddr, IwFreq, Parameter, PowerInfo, RetryInfo,
    WirelessMode,
};
use crate::range::{fetch_range, RangeInfo};
use crate::scan::{fetch_scan_results, poll_scan, trigger_scan, AccessPoint, PollPolicy};
use crate::stats::{fetch_statistics, LinkStatistics};
use crate::transport::{IoctlSocket, IwReq};

/// Handle on one wireless interface.
#[derive(Debug, Clone)]
pub struct WirelessDevice {
    interface: String,
}

impl WirelessDevice {
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
        }
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    fn get(&self, opcode: u32, operation: &'static str) -> Result<IwReq> {
        let socket = IoctlSocket::open()?;
        let mut req = IwReq::new(&self.interface)?;
        socket.request(&self.interface, opcode, operation, &mut req)?;
        Ok(req)
    }

    fn get_param(&self, opcode: u32, operation: &'static str) -> Result<Parameter> {
        let req = self.get(opcode, operation)?;
        Ok(Parameter::from_wire(&req.param()?))
    }

    /// Issue a point-carrying get into `buf`, returning the written length
    /// and the flags the kernel wrote back.
    fn get_point(
        &self,
        opcode: u32,
        operation: &'static str,
        buf: &mut [u8],
        flags: u16,
    ) -> Result<(usize, u16)> {
        let socket = IoctlSocket::open()?;
        let mut req = IwReq::new(&self.interface)?;
        req.set_point(buf.as_mut_ptr(), buf.len() as u16, flags);
        socket.request(&self.interface, opcode, operation, &mut req)?;
        let written = req.point_len() as usize;
        if written > buf.len() {
            return Err(WextError::corrupt(
                operation,
                format!("kernel claims {} bytes in a {} byte buffer", written, buf.len()),
            ));
        }
        Ok((written, req.point_flags()))
    }

    fn set(&self, opcode: u32, operation: &'static str, req: &mut IwReq) -> Result<()> {
        let socket = IoctlSocket::open()?;
        socket.request(&self.interface, opcode, operation, req)
    }

    /// Wireless protocol name, e.g. `IEEE 802.11`. Doubles as the cheapest
    /// probe for whether an interface is wireless at all.
    pub fn protocol_name(&self) -> Result<String> {
        let req = self.get(SIOCGIWNAME, "get protocol name")?;
        Ok(decode_essid(&req.data))
    }

    /// Current ESSID, or `None` when the interface has none set.
    pub fn essid(&self) -> Result<Option<String>> {
        let mut buf = [0u8; IW_ESSID_MAX_SIZE + 1];
        let (len, flags) = self.get_point(SIOCGIWESSID, "get essid", &mut buf, 0)?;
        // Flags word low bit: an ESSID is active.
        if flags & 1 == 0 {
            return Ok(None);
        }
        Ok(Some(decode_essid(&buf[..len])))
    }

    /// Set the ESSID; an empty string asks the driver to associate with any.
    pub fn set_essid(&self, essid: &str) -> Result<()> {
        let bytes = essid.as_bytes();
        if bytes.len() > IW_ESSID_MAX_SIZE {
            return Err(WextError::ArgumentTooLarge {
                what: "ESSID",
                limit: Some(IW_ESSID_MAX_SIZE),
            });
        }
        info!(interface = %self.interface, essid, "setting essid");
        let mut data = [0u8; IW_ESSID_MAX_SIZE + 1];
        data[..bytes.len()].copy_from_slice(bytes);
        let flags = if bytes.is_empty() { 0 } else { 1 };
        let mut req = IwReq::new(&self.interface)?;
        req.set_point(data.as_mut_ptr(), bytes.len() as u16, flags);
        self.set(SIOCSIWESSID, "set essid", &mut req)
    }

    /// Station nickname, a free-form identifier some drivers keep.
    pub fn nickname(&self) -> Result<String> {
        let mut buf = [0u8; IW_ESSID_MAX_SIZE + 1];
        let (len, _) = self.get_point(SIOCGIWNICKN, "get nickname", &mut buf, 0)?;
        Ok(decode_essid(&buf[..len]))
    }

    pub fn set_nickname(&self, nickname: &str) -> Result<()> {
        let bytes = nickname.as_bytes();
        if bytes.len() > IW_ESSID_MAX_SIZE {
            return Err(WextError::ArgumentTooLarge {
                what: "nickname",
                limit: Some(IW_ESSID_MAX_SIZE),
            });
        }
        info!(interface = %self.interface, nickname, "setting nickname");
        let mut data = [0u8; IW_ESSID_MAX_SIZE + 1];
        data[..bytes.len()].copy_from_slice(bytes);
        let mut req = IwReq::new(&self.interface)?;
        req.set_point(data.as_mut_ptr(), bytes.len() as u16, 0);
        self.set(SIOCSIWNICKN, "set nickname", &mut req)
    }

    pub fn mode(&self) -> Result<WirelessMode> {
        let req = self.get(SIOCGIWMODE, "get mode")?;
        WirelessMode::from_u32(req.u32_value())
    }

    pub fn set_mode(&self, mode: WirelessMode) -> Result<()> {
        info!(interface = %self.interface, mode = %mode, "setting mode");
        let mut req = IwReq::new(&self.interface)?;
        req.set_u32(mode.as_u32());
        self.set(SIOCSIWMODE, "set mode", &mut req)
    }

    /// Current frequency or channel, disambiguated by magnitude.
    pub fn frequency(&self) -> Result<Frequency> {
        let req = self.get(SIOCGIWFREQ, "get frequency")?;
        Ok(req.freq()?.interpret())
    }

    pub fn set_frequency_hz(&self, hz: f64) -> Result<()> {
        info!(interface = %self.interface, hz, "setting frequency");
        let mut req = IwReq::new(&self.interface)?;
        req.set_freq(&IwFreq::from_hz(hz));
        self.set(SIOCSIWFREQ, "set frequency", &mut req)
    }

    pub fn set_channel(&self, channel: i32) -> Result<()> {
        info!(interface = %self.interface, channel, "setting channel");
        let mut req = IwReq::new(&self.interface)?;
        req.set_freq(&IwFreq::from_channel(channel));
        self.set(SIOCSIWFREQ, "set channel", &mut req)
    }

    /// Associated access point address. All-zero means not associated, but
    /// the address is returned as-is.
    pub fn access_point(&self) -> Result<HwAddr> {
        let req = self.get(SIOCGIWAP, "get access point")?;
        HwAddr::from_sockaddr(&req.data)
    }

    pub fn set_access_point(&self, addr: HwAddr) -> Result<()> {
        info!(interface = %self.interface, addr = %addr, "setting access point");
        let mut req = IwReq::new(&self.interface)?;
        req.data.copy_from_slice(&addr.to_sockaddr());
        self.set(SIOCSIWAP, "set access point", &mut req)
    }

    /// Current bitrate in bits per second.
    pub fn bitrate(&self) -> Result<Parameter> {
        self.get_param(SIOCGIWRATE, "get bitrate")
    }

    /// Transmit power; units depend on the driver's tx-power flags.
    pub fn tx_power(&self) -> Result<Parameter> {
        self.get_param(SIOCGIWTXPOW, "get tx power")
    }

    pub fn sensitivity(&self) -> Result<Parameter> {
        self.get_param(SIOCGIWSENS, "get sensitivity")
    }

    pub fn rts_threshold(&self) -> Result<Parameter> {
        self.get_param(SIOCGIWRTS, "get rts threshold")
    }

    pub fn fragmentation_threshold(&self) -> Result<Parameter> {
        self.get_param(SIOCGIWFRAG, "get fragmentation threshold")
    }

    /// Retry limits and lifetimes with every modifier bit preserved.
    pub fn retry(&self) -> Result<RetryInfo> {
        let req = self.get(SIOCGIWRETRY, "get retry")?;
        Ok(RetryInfo::from_wire(&req.param()?))
    }

    /// Power management settings, quantity and mode axes decoded separately.
    pub fn power_management(&self) -> Result<PowerInfo> {
        let req = self.get(SIOCGIWPOWER, "get power management")?;
        Ok(PowerInfo::from_wire(&req.param()?))
    }

    /// Encryption state of the current key slot.
    pub fn encryption(&self) -> Result<EncryptionInfo> {
        self.encryption_slot(0)
    }

    /// Encryption state of one explicit key slot (1-based).
    pub fn encryption_key(&self, index: u8) -> Result<EncryptionInfo> {
        self.encryption_slot(index as u16)
    }

    fn encryption_slot(&self, index: u16) -> Result<EncryptionInfo> {
        let mut buf = [0u8; IW_ENCODING_TOKEN_MAX];
        let (len, flags) =
            self.get_point(SIOCGIWENCODE, "get encryption", &mut buf, index)?;
        Ok(EncryptionInfo::from_point(flags, &buf[..len]))
    }

    /// All key slots the driver exposes, keyed by 1-based index.
    pub fn encryption_keys(&self) -> Result<Vec<(u8, EncryptionInfo)>> {
        let range = self.range()?;
        let mut keys = Vec::with_capacity(range.max_encoding_tokens as usize);
        for index in 1..=range.max_encoding_tokens {
            keys.push((index, self.encryption_key(index)?));
        }
        Ok(keys)
    }

    /// Install key material, optionally into an explicit slot.
    pub fn set_key(&self, key: &[u8], index: Option<u8>) -> Result<()> {
        if key.len() > IW_ENCODING_TOKEN_MAX {
            return Err(WextError::ArgumentTooLarge {
                what: "encryption key",
                limit: Some(IW_ENCODING_TOKEN_MAX),
            });
        }
        info!(interface = %self.interface, index, "setting encryption key");
        let mut data = [0u8; IW_ENCODING_TOKEN_MAX];
        data[..key.len()].copy_from_slice(key);
        let flags = index.map(u16::from).unwrap_or(0) & IW_ENCODE_INDEX;
        let mut req = IwReq::new(&self.interface)?;
        req.set_point(data.as_mut_ptr(), key.len() as u16, flags);
        self.set(SIOCSIWENCODE, "set encryption key", &mut req)
    }

    pub fn disable_encryption(&self) -> Result<()> {
        info!(interface = %self.interface, "disabling encryption");
        let mut req = IwReq::new(&self.interface)?;
        req.set_point(std::ptr::null_mut(), 0, IW_ENCODE_DISABLED);
        self.set(SIOCSIWENCODE, "disable encryption", &mut req)
    }

    /// Ask the driver to apply pending changes.
    pub fn commit(&self) -> Result<()> {
        info!(interface = %self.interface, "committing pending changes");
        let mut req = IwReq::new(&self.interface)?;
        self.set(SIOCSIWCOMMIT, "commit", &mut req)
    }

    /// Driver capability report.
    pub fn range(&self) -> Result<RangeInfo> {
        let socket = IoctlSocket::open()?;
        fetch_range(&socket, &self.interface)
    }

    /// Live link statistics.
    pub fn statistics(&self) -> Result<LinkStatistics> {
        let socket = IoctlSocket::open()?;
        fetch_statistics(&socket, &self.interface)
    }

    /// Kick off a scan without waiting. Results arrive asynchronously; fetch
    /// them with [`scan_results`](Self::scan_results).
    pub fn trigger_scan(&self) -> Result<()> {
        info!(interface = %self.interface, "triggering scan");
        let socket = IoctlSocket::open()?;
        trigger_scan(&socket, &self.interface)
    }

    /// Fetch whatever scan results the kernel has right now. `NotReady`
    /// means the scan is still running.
    pub fn scan_results(&self) -> Result<Vec<AccessPoint>> {
        let socket = IoctlSocket::open()?;
        fetch_scan_results(&socket, &self.interface)
    }

    /// Trigger a scan and poll until results arrive or the policy gives up.
    ///
    /// A driver already mid-scan reports busy on the trigger; that is
    /// treated as a scan in flight and polling proceeds.
    pub fn scan(&self, policy: &PollPolicy) -> Result<Vec<AccessPoint>> {
        match self.trigger_scan() {
            Ok(()) => {}
            Err(err) if err.is_retryable() => {}
            Err(err) => return Err(err),
        }
        poll_scan(&self.interface, policy, || self.scan_results())
    }
}
