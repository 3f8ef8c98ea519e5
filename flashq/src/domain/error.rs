//! Queue errors.
//!
//! Device failures come through the `FlashDevice` port's error type and are
//! wrapped here next to the queue's own failure modes.

use crate::domain::value_objects::{FlashGeometry, SectorIndex};
use core::fmt;

/// Errors returned by `SectorQueue` operations.
#[derive(Debug)]
#[non_exhaustive]
pub enum QueueError<E> {
    /// The device failed to come up.
    DeviceInit(E),

    /// The device cannot hold the configured region.
    GeometryTooSmall {
        /// Bytes the configuration needs, reserved offset included.
        required: u64,
        /// Bytes the device reports.
        available: u64,
    },

    /// The device geometry differs from the configuration.
    ///
    /// Only returned under `GeometryPolicy::Strict`.
    GeometryMismatch {
        /// Geometry implied by the configuration.
        configured: FlashGeometry,
        /// Geometry reported by the device.
        detected: FlashGeometry,
    },

    /// Every data sector holds an undelivered payload.
    NoSpace,

    /// No data sector holds an undelivered payload.
    NoData,

    /// A status byte did not read back as written.
    ///
    /// The in-memory table was left unchanged, so it may now disagree with
    /// the map sector. Treat the operation as failed.
    VerifyFailed {
        /// Table index whose status was being written.
        index: SectorIndex,
        /// Byte that was written.
        expected: u8,
        /// Byte that was read back.
        found: u8,
    },

    /// A formatted table contains an unrecognized status byte.
    ///
    /// Only returned under `CorruptionPolicy::Fail`.
    CorruptedStatus {
        /// First offending table index.
        index: SectorIndex,
        /// The raw byte found there.
        byte: u8,
    },

    /// `initialize` has not completed successfully yet.
    NotInitialized,

    /// Device error from the underlying `FlashDevice` implementation.
    Device(E),
}

impl<E> QueueError<E> {
    /// Check if this is the capacity-exhausted error.
    #[inline]
    pub const fn is_no_space(&self) -> bool {
        matches!(self, Self::NoSpace)
    }

    /// Check if this is the nothing-to-read error.
    #[inline]
    pub const fn is_no_data(&self) -> bool {
        matches!(self, Self::NoData)
    }

    /// The wrapped device error, if any.
    pub fn device_error(&self) -> Option<&E> {
        match self {
            Self::DeviceInit(e) | Self::Device(e) => Some(e),
            _ => None,
        }
    }
}

impl<E: fmt::Display> fmt::Display for QueueError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceInit(e) => write!(f, "Flash device init failed: {}", e),
            Self::GeometryTooSmall {
                required,
                available,
            } => write!(
                f,
                "Flash device too small: need {} bytes, device has {}",
                required, available
            ),
            Self::GeometryMismatch {
                configured,
                detected,
            } => write!(
                f,
                "Flash geometry mismatch: configured {}, detected {}",
                configured, detected
            ),
            Self::NoSpace => write!(f, "No empty sector left (all sectors unread)"),
            Self::NoData => write!(f, "No unread sector available"),
            Self::VerifyFailed {
                index,
                expected,
                found,
            } => write!(
                f,
                "Status write for {} failed verification: wrote {:#04x}, read {:#04x}",
                index, expected, found
            ),
            Self::CorruptedStatus { index, byte } => {
                write!(f, "Corrupted status byte {:#04x} at {}", byte, index)
            }
            Self::NotInitialized => write!(f, "Queue is not initialized"),
            Self::Device(e) => write!(f, "Flash device error: {}", e),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> core::error::Error for QueueError<E> {}
