//! Queue region configuration value object.

use super::{FlashGeometry, SectorIndex};

/// Reference sector size (W25Qxx family, most SPI NOR parts).
pub const SECTOR_SIZE_4K: u32 = 4096;

/// How to treat a device whose reported geometry differs from the configuration.
///
/// The configured geometry always defines the on-flash layout; this only
/// decides whether a mismatch aborts initialization.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeometryPolicy {
    /// Log the mismatch and continue with the configured geometry.
    #[default]
    Warn,
    /// Fail initialization with `GeometryMismatch`.
    Strict,
}

/// How to treat unrecognized status bytes found in a formatted table.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CorruptionPolicy {
    /// Fail initialization with `CorruptedStatus`.
    #[default]
    Fail,
    /// Keep going; corrupted entries are treated as reclaimable and become
    /// `Empty` at the next compaction.
    Reclaim,
}

/// Configuration of the flash region managed by the queue.
///
/// The region starts at `reserved_offset` (everything before it belongs to
/// other users, e.g. firmware images) and runs to `total_size`. Its first
/// sector is the map sector, the rest are data sectors.
///
/// ```text
/// 0              reserved_offset                                  total_size
/// ├──────────────┼───────────┬───────────┬───────────┬─────┬──────────┤
/// │  reserved    │ map (#0)  │ data #1   │ data #2   │ ... │ data N-1 │
/// └──────────────┴───────────┴───────────┴───────────┴─────┴──────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    total_size: u32,
    reserved_offset: u32,
    sector_size: u32,
    sector_count: u32,
    geometry_policy: GeometryPolicy,
    corruption_policy: CorruptionPolicy,
}

impl QueueConfig {
    /// Create a new queue configuration.
    ///
    /// The number of table entries is `(total_size - reserved_offset) / sector_size`,
    /// including the map sector itself.
    ///
    /// # Errors
    ///
    /// Returns an error if the sector size is zero, the reserved offset is
    /// not sector aligned, the region holds fewer than two sectors, or the
    /// status table would not fit in one sector.
    ///
    /// # Examples
    ///
    /// ```
    /// use flashq::domain::QueueConfig;
    ///
    /// let config = QueueConfig::new(8 * 1024 * 1024, 1024 * 1024, 4096).unwrap();
    /// assert_eq!(config.sector_count(), 1792);
    /// assert_eq!(config.data_sectors(), 1791);
    /// ```
    pub const fn new(
        total_size: u32,
        reserved_offset: u32,
        sector_size: u32,
    ) -> Result<Self, ConfigError> {
        if sector_size == 0 {
            return Err(ConfigError::ZeroSectorSize);
        }

        if reserved_offset % sector_size != 0 {
            return Err(ConfigError::UnalignedReservedOffset {
                reserved_offset,
                sector_size,
            });
        }

        let sector_count = total_size.saturating_sub(reserved_offset) / sector_size;
        if sector_count < 2 {
            return Err(ConfigError::TooFewSectors { sector_count });
        }

        if sector_count > sector_size {
            return Err(ConfigError::TooManySectors {
                sector_count,
                max: sector_size,
            });
        }

        Ok(Self {
            total_size,
            reserved_offset,
            sector_size,
            sector_count,
            geometry_policy: GeometryPolicy::Warn,
            corruption_policy: CorruptionPolicy::Fail,
        })
    }

    /// Region of `sector_count` sectors (map sector included) after `reserved_offset`.
    ///
    /// # Examples
    ///
    /// ```
    /// use flashq::domain::QueueConfig;
    ///
    /// let config = QueueConfig::with_sector_count(0, 4096, 10).unwrap();
    /// assert_eq!(config.total_size(), 40960);
    /// assert_eq!(config.data_sectors(), 9);
    /// ```
    pub const fn with_sector_count(
        reserved_offset: u32,
        sector_size: u32,
        sector_count: u32,
    ) -> Result<Self, ConfigError> {
        let region = sector_count.saturating_mul(sector_size);
        Self::new(reserved_offset.saturating_add(region), reserved_offset, sector_size)
    }

    /// Reference layout: 8 MB W25Q64 with the first megabyte reserved.
    pub const fn w25q64() -> Self {
        Self {
            total_size: 8 * 1024 * 1024,
            reserved_offset: 1024 * 1024,
            sector_size: SECTOR_SIZE_4K,
            sector_count: (7 * 1024 * 1024) / SECTOR_SIZE_4K,
            geometry_policy: GeometryPolicy::Warn,
            corruption_policy: CorruptionPolicy::Fail,
        }
    }

    /// Set the geometry mismatch policy.
    pub const fn with_geometry_policy(mut self, policy: GeometryPolicy) -> Self {
        self.geometry_policy = policy;
        self
    }

    /// Set the corrupted status policy.
    pub const fn with_corruption_policy(mut self, policy: CorruptionPolicy) -> Self {
        self.corruption_policy = policy;
        self
    }

    /// Configured total device size in bytes.
    #[inline]
    pub const fn total_size(&self) -> u32 {
        self.total_size
    }

    /// Bytes before the queue region.
    #[inline]
    pub const fn reserved_offset(&self) -> u32 {
        self.reserved_offset
    }

    /// Sector size in bytes.
    #[inline]
    pub const fn sector_size(&self) -> u32 {
        self.sector_size
    }

    /// Number of status table entries, signature slot included.
    #[inline]
    pub const fn sector_count(&self) -> u32 {
        self.sector_count
    }

    /// Number of data sectors, i.e. the queue capacity in payloads.
    #[inline]
    pub const fn data_sectors(&self) -> u32 {
        self.sector_count - 1
    }

    /// Geometry mismatch policy.
    #[inline]
    pub const fn geometry_policy(&self) -> GeometryPolicy {
        self.geometry_policy
    }

    /// Corrupted status policy.
    #[inline]
    pub const fn corruption_policy(&self) -> CorruptionPolicy {
        self.corruption_policy
    }

    /// Absolute sector number of the map sector.
    #[inline]
    pub const fn map_sector(&self) -> u32 {
        self.reserved_offset / self.sector_size
    }

    /// Absolute sector number backing a table index.
    #[inline]
    pub const fn data_sector(&self, index: SectorIndex) -> u32 {
        self.map_sector() + index.value()
    }

    /// Absolute byte address of the status byte for a table index.
    #[inline]
    pub const fn status_address(&self, index: SectorIndex) -> u32 {
        self.reserved_offset + index.value()
    }

    /// Bytes the device must provide for the configured region.
    #[inline]
    pub const fn required_bytes(&self) -> u64 {
        self.reserved_offset as u64 + self.sector_count as u64 * self.sector_size as u64
    }

    /// The geometry a device matching this configuration would report.
    pub const fn geometry(&self) -> FlashGeometry {
        FlashGeometry::from_capacity(self.total_size as u64, self.sector_size)
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self::w25q64()
    }
}

/// Errors that can occur when creating a QueueConfig.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Sector size is zero.
    ZeroSectorSize,
    /// Reserved offset does not start on a sector boundary.
    UnalignedReservedOffset {
        /// The requested reserved offset.
        reserved_offset: u32,
        /// The sector size.
        sector_size: u32,
    },
    /// The region cannot hold a map sector and at least one data sector.
    TooFewSectors {
        /// Sectors available after the reserved offset.
        sector_count: u32,
    },
    /// The status table would not fit in a single map sector.
    TooManySectors {
        /// Sectors available after the reserved offset.
        sector_count: u32,
        /// Entries one map sector can hold.
        max: u32,
    },
    /// Configured sector size differs from the compiled sector size.
    SectorSizeMismatch {
        /// Sector size in the configuration.
        configured: u32,
        /// Sector size the queue was compiled for.
        compiled: usize,
    },
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ZeroSectorSize => write!(f, "Sector size cannot be zero"),
            Self::UnalignedReservedOffset {
                reserved_offset,
                sector_size,
            } => write!(
                f,
                "Reserved offset {:#x} must be a multiple of sector size {}",
                reserved_offset, sector_size
            ),
            Self::TooFewSectors { sector_count } => write!(
                f,
                "Region holds {} sectors, need a map sector and at least one data sector",
                sector_count
            ),
            Self::TooManySectors { sector_count, max } => write!(
                f,
                "Region holds {} sectors but one map sector only tracks {}",
                sector_count, max
            ),
            Self::SectorSizeMismatch {
                configured,
                compiled,
            } => write!(
                f,
                "Configured sector size {} does not match compiled sector size {}",
                configured, compiled
            ),
        }
    }
}

impl core::error::Error for ConfigError {}
