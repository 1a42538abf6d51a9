use std::io;

use nix::errno::Errno;
use thiserror::Error;

/// Unified error type for all wext operations.
///
/// Every kernel failure code is mapped to exactly one variant so callers can
/// branch on the kind instead of re-parsing errno values. `NotReady` and
/// `NoStatisticsYet` are the only kinds a caller should treat as routine.
#[derive(Error, Debug)]
pub enum WextError {
    #[error("Permission denied for {operation} on '{interface}'. Root privileges required.")]
    PermissionDenied {
        interface: String,
        operation: &'static str,
    },

    #[error("Device '{interface}' does not support {operation}")]
    Unsupported {
        interface: String,
        operation: &'static str,
    },

    #[error("Interface '{interface}' not found. Verify it exists with 'ip link show'.")]
    DeviceNotFound { interface: String },

    #[error("Argument for {what} exceeds the kernel's fixed-size buffer")]
    ArgumentTooLarge {
        what: &'static str,
        /// Capacity in bytes, when the rejecting side knows it. The kernel's
        /// E2BIG answer does not say which buffer overflowed.
        limit: Option<usize>,
    },

    #[error("Results for {operation} on '{interface}' are not ready yet")]
    NotReady {
        interface: String,
        operation: &'static str,
    },

    #[error("No link statistics available for '{interface}' (not associated)")]
    NoStatisticsYet { interface: String },

    #[error("Corrupt kernel response while decoding {what}: {reason}")]
    CorruptResponse { what: &'static str, reason: String },

    #[error("Scan on '{interface}' still not ready after {attempts} poll attempts")]
    ScanTimedOut { interface: String, attempts: u32 },

    #[error("Invalid argument: {parameter} = '{value}': {reason}")]
    InvalidArgument {
        parameter: &'static str,
        value: String,
        reason: String,
    },

    #[error("Unexpected kernel error during {operation} on '{interface}': {source} (errno {errno})")]
    UnexpectedKernelError {
        interface: String,
        operation: &'static str,
        errno: i32,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, WextError>;

impl WextError {
    /// Map a kernel errno from an ioctl to the error taxonomy.
    pub(crate) fn from_errno(interface: &str, operation: &'static str, errno: Errno) -> Self {
        match errno {
            Errno::EPERM | Errno::EACCES => Self::PermissionDenied {
                interface: interface.to_string(),
                operation,
            },
            Errno::EOPNOTSUPP | Errno::ENOTTY | Errno::EINVAL => Self::Unsupported {
                interface: interface.to_string(),
                operation,
            },
            Errno::ENODEV | Errno::ENXIO | Errno::ENOENT => Self::DeviceNotFound {
                interface: interface.to_string(),
            },
            Errno::E2BIG => Self::ArgumentTooLarge {
                what: operation,
                limit: None,
            },
            Errno::EAGAIN | Errno::EBUSY => Self::NotReady {
                interface: interface.to_string(),
                operation,
            },
            other => Self::UnexpectedKernelError {
                interface: interface.to_string(),
                operation,
                errno: other as i32,
                source: io::Error::from_raw_os_error(other as i32),
            },
        }
    }

    /// Create a corrupt-response error with context.
    pub(crate) fn corrupt(what: &'static str, reason: impl Into<String>) -> Self {
        Self::CorruptResponse {
            what,
            reason: reason.into(),
        }
    }

    /// Check if this error kind is safe to retry (scan results pending).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NotReady { .. })
    }
}
