//! Typed access to the Linux Wireless Extensions ioctl interface.
//!
//! This crate speaks the legacy wireless ioctl family directly: the same
//! binary handshake `iwconfig` and `iwlist` use. [`WirelessDevice`] names an
//! interface and exposes every operation as a typed method; the codec
//! modules underneath decode the kernel's fixed C structures bit-exactly.
//!
//! The parsers and flag tables compile everywhere and can be tested against
//! crafted buffers; the transport and device layers need a Linux kernel.
//!
//! ```no_run
//! use wext::{PollPolicy, WirelessDevice};
//!
//! # fn main() -> wext::Result<()> {
//! let dev = WirelessDevice::new("wlan0");
//! println!("{} speaks {}", dev.interface(), dev.protocol_name()?);
//! for cell in dev.scan(&PollPolicy::default())? {
//!     println!("{} {:?}", cell.bssid, cell.essid);
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod flags;
pub mod params;
pub mod range;
pub mod scan;
pub mod stats;

#[cfg(target_os = "linux")]
pub mod transport;

#[cfg(target_os = "linux")]
pub mod device;

pub use error::{Result, WextError};
pub use params::{
    EncryptionInfo, Frequency, HwAddr, LinkQuality, Parameter, PowerInfo, PowerKind, PowerMode,
    RetryInfo, SecurityMode, WirelessMode,
};
pub use range::{ChannelFrequency, RangeInfo};
pub use scan::{AccessPoint, EncryptionState, PollPolicy};
pub use stats::{DiscardCounters, LinkStatistics};

#[cfg(target_os = "linux")]
pub use device::WirelessDevice;
