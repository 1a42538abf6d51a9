//! Raw ioctl transport: a datagram socket and the `iwreq` request image.
//!
//! Every wireless ioctl goes through [`IoctlSocket::request`]: build an
//! [`IwReq`], fill its payload area, issue the opcode, and map any kernel
//! failure through the errno classification in [`WextError`]. The payload
//! area is a plain byte image; the typed codecs in the sibling modules decide
//! what the 16 bytes mean for each opcode.

use std::io;
use std::mem;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};

use nix::errno::Errno;
use tracing::debug;

use crate::error::{Result, WextError};
use crate::flags::IFNAMSIZ;
use crate::params::{IwFreq, IwParam};

/// Byte image of `struct iwreq`: interface name followed by the 16-byte
/// `iwreq_data` union.
#[repr(C)]
pub struct IwReq {
    pub ifr_name: [u8; IFNAMSIZ],
    pub data: [u8; 16],
}

impl IwReq {
    pub fn new(interface: &str) -> Result<Self> {
        if interface.is_empty() {
            return Err(WextError::InvalidArgument {
                parameter: "interface",
                value: interface.to_string(),
                reason: "interface name is empty".to_string(),
            });
        }
        let bytes = interface.as_bytes();
        // One byte reserved for the NUL terminator.
        if bytes.len() >= IFNAMSIZ {
            return Err(WextError::ArgumentTooLarge {
                what: "interface name",
                limit: Some(IFNAMSIZ - 1),
            });
        }
        let mut ifr_name = [0u8; IFNAMSIZ];
        ifr_name[..bytes.len()].copy_from_slice(bytes);
        Ok(Self {
            ifr_name,
            data: [0u8; 16],
        })
    }

    /// Interpret the union as `struct iw_param`.
    pub fn param(&self) -> Result<IwParam> {
        IwParam::from_bytes(&self.data[..IwParam::SIZE])
    }

    pub fn set_param(&mut self, param: &IwParam) {
        self.data[..IwParam::SIZE].copy_from_slice(&param.to_bytes());
    }

    /// Interpret the union as `struct iw_freq`.
    pub fn freq(&self) -> Result<IwFreq> {
        IwFreq::from_bytes(&self.data[..IwFreq::SIZE])
    }

    pub fn set_freq(&mut self, freq: &IwFreq) {
        self.data[..IwFreq::SIZE].copy_from_slice(&freq.to_bytes());
    }

    /// Interpret the union as a `u32` in its first word.
    pub fn u32_value(&self) -> u32 {
        u32::from_ne_bytes([self.data[0], self.data[1], self.data[2], self.data[3]])
    }

    pub fn set_u32(&mut self, value: u32) {
        self.data[..4].copy_from_slice(&value.to_ne_bytes());
    }

    /// Point a `struct iw_point` at a caller-owned buffer.
    ///
    /// The buffer must stay alive and pinned for the duration of the ioctl;
    /// the kernel reads or writes through the raw pointer stored here.
    pub fn set_point(&mut self, ptr: *mut u8, length: u16, flags: u16) {
        let ptr_size = mem::size_of::<usize>();
        self.data[..ptr_size].copy_from_slice(&(ptr as usize).to_ne_bytes());
        self.data[ptr_size..ptr_size + 2].copy_from_slice(&length.to_ne_bytes());
        self.data[ptr_size + 2..ptr_size + 4].copy_from_slice(&flags.to_ne_bytes());
    }

    /// Length field of the `iw_point`, as written back by the kernel.
    pub fn point_len(&self) -> u16 {
        let p = mem::size_of::<usize>();
        u16::from_ne_bytes([self.data[p], self.data[p + 1]])
    }

    /// Flags field of the `iw_point`, as written back by the kernel.
    pub fn point_flags(&self) -> u16 {
        let p = mem::size_of::<usize>();
        u16::from_ne_bytes([self.data[p + 2], self.data[p + 3]])
    }
}

/// A datagram socket held open for issuing wireless ioctls.
///
/// The wireless ioctl family works on any AF_INET socket; no bind or connect
/// is needed. The descriptor closes on drop.
pub struct IoctlSocket {
    fd: OwnedFd,
}

impl IoctlSocket {
    pub fn open() -> Result<Self> {
        let raw = unsafe { libc::socket(libc::AF_INET, libc::SOCK_DGRAM, 0) };
        if raw < 0 {
            let err = io::Error::last_os_error();
            let errno = err.raw_os_error().unwrap_or(0);
            return Err(WextError::UnexpectedKernelError {
                interface: String::new(),
                operation: "open ioctl socket",
                errno,
                source: err,
            });
        }
        Ok(Self {
            fd: unsafe { OwnedFd::from_raw_fd(raw) },
        })
    }

    /// Issue one wireless ioctl, mapping failure through the errno table.
    pub fn request(
        &self,
        interface: &str,
        opcode: u32,
        operation: &'static str,
        req: &mut IwReq,
    ) -> Result<()> {
        debug!(interface, opcode, "{}", operation);
        let rc = unsafe {
            libc::ioctl(
                self.fd.as_raw_fd(),
                opcode as libc::c_ulong,
                req as *mut IwReq,
            )
        };
        if rc < 0 {
            let errno = Errno::last();
            debug!(interface, ?errno, "{} failed", operation);
            return Err(WextError::from_errno(interface, operation, errno));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_image_layout() {
        assert_eq!(mem::size_of::<IwReq>(), IFNAMSIZ + 16);
    }

    #[test]
    fn name_is_nul_terminated() {
        let req = IwReq::new("wlan0").unwrap();
        assert_eq!(&req.ifr_name[..5], b"wlan0");
        assert!(req.ifr_name[5..].iter().all(|&b| b == 0));
    }

    #[test]
    fn name_length_limits() {
        assert!(matches!(
            IwReq::new(""),
            Err(WextError::InvalidArgument { .. })
        ));
        // 15 bytes fit, 16 do not (terminator needs a byte).
        assert!(IwReq::new("a23456789012345").is_ok());
        assert!(matches!(
            IwReq::new("a234567890123456"),
            Err(WextError::ArgumentTooLarge { limit: Some(15), .. })
        ));
    }

    #[test]
    fn param_round_trip_through_union() {
        let mut req = IwReq::new("wlan0").unwrap();
        let param = IwParam {
            value: -42,
            fixed: false,
            disabled: true,
            flags: 0x1234,
        };
        req.set_param(&param);
        assert_eq!(req.param().unwrap(), param);
    }

    #[test]
    fn point_fields_round_trip() {
        let mut req = IwReq::new("wlan0").unwrap();
        let mut buf = [0u8; 32];
        req.set_point(buf.as_mut_ptr(), 32, 0x0201);
        assert_eq!(req.point_len(), 32);
        assert_eq!(req.point_flags(), 0x0201);
    }

    #[test]
    fn u32_round_trip_through_union() {
        let mut req = IwReq::new("wlan0").unwrap();
        req.set_u32(0xDEAD_BEEF);
        assert_eq!(req.u32_value(), 0xDEAD_BEEF);
    }
}
