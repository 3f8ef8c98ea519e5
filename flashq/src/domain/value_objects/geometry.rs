//! Flash geometry as reported by a device or implied by a configuration.

use core::fmt;

/// Bytes per kilobyte, as flash datasheets count them.
pub const KILOBYTE: u32 = 1024;

/// Physical layout of a flash device.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashGeometry {
    /// Total capacity in kilobytes.
    pub capacity_kb: u32,
    /// Number of erase sectors.
    pub sector_count: u32,
    /// Erase sector size in bytes.
    pub sector_size: u32,
}

impl FlashGeometry {
    /// Build a geometry from a byte capacity and a sector size.
    ///
    /// # Examples
    ///
    /// ```
    /// use flashq::domain::FlashGeometry;
    ///
    /// let geometry = FlashGeometry::from_capacity(8 * 1024 * 1024, 4096);
    /// assert_eq!(geometry.capacity_kb, 8192);
    /// assert_eq!(geometry.sector_count, 2048);
    /// ```
    pub const fn from_capacity(capacity_bytes: u64, sector_size: u32) -> Self {
        let sector_count = if sector_size == 0 {
            0
        } else {
            (capacity_bytes / sector_size as u64) as u32
        };
        Self {
            capacity_kb: (capacity_bytes / KILOBYTE as u64) as u32,
            sector_count,
            sector_size,
        }
    }

    /// Total capacity in bytes.
    ///
    /// Counted from whole sectors, so a capacity that is not a multiple of a
    /// kilobyte is not rounded down.
    #[inline]
    pub const fn capacity_bytes(&self) -> u64 {
        if self.sector_size == 0 {
            self.capacity_kb as u64 * KILOBYTE as u64
        } else {
            self.sector_count as u64 * self.sector_size as u64
        }
    }
}

impl fmt::Display for FlashGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} KB ({} sectors of {} bytes)",
            self.capacity_kb, self.sector_count, self.sector_size
        )
    }
}
