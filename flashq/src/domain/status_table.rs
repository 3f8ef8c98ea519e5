//! StatusTable domain service - the persistent allocation record.
//!
//! The table lives in the map sector (first sector of the queue region) and
//! is mirrored in RAM. Byte 0 is the signature, byte `k` is the status of
//! data sector `k`. Single transitions are programmed in place one byte at a
//! time; formatting and compaction erase and rewrite the whole sector.

use aligned::{Aligned, Alignment};

use crate::domain::{
    entities::{SectorStatus, SIGNATURE},
    error::QueueError,
    ports::FlashDevice,
    value_objects::{ConfigError, QueueConfig, SectorIndex},
};

/// Per-state entry counts of the status table.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusSummary {
    /// Writable sectors.
    pub empty: u32,
    /// Sectors holding undelivered payloads.
    pub unread: u32,
    /// Delivered sectors waiting for compaction.
    pub read: u32,
    /// Entries with an unrecognized byte.
    pub corrupted: u32,
}

impl StatusSummary {
    /// Total number of data sectors counted.
    pub const fn total(&self) -> u32 {
        self.empty + self.unread + self.read + self.corrupted
    }
}

/// Result of a successful allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    /// Sector to write.
    pub index: SectorIndex,
    /// Entries a compaction turned back to empty to find it (0 if none ran).
    pub reclaimed: u32,
}

/// In-memory mirror of the map sector plus the operations on it.
///
/// # Type Parameters
///
/// - `A`: Buffer alignment required by the device
/// - `SIZE`: Sector size in bytes; the whole map sector is mirrored
pub struct StatusTable<A: Alignment, const SIZE: usize> {
    entries: Aligned<A, [u8; SIZE]>,
    config: QueueConfig,
}

impl<A: Alignment, const SIZE: usize> StatusTable<A, SIZE> {
    /// Create an unloaded table (every byte reads as unformatted).
    ///
    /// # Errors
    ///
    /// Returns `SectorSizeMismatch` if the configured sector size is not
    /// `SIZE`. A validated config never has more entries than its sector
    /// size, so the table always fits the mirror.
    pub fn new(config: QueueConfig) -> Result<Self, ConfigError> {
        if config.sector_size() as usize != SIZE {
            return Err(ConfigError::SectorSizeMismatch {
                configured: config.sector_size(),
                compiled: SIZE,
            });
        }

        Ok(Self {
            entries: Aligned([SectorStatus::UNFORMATTED_BYTE; SIZE]),
            config,
        })
    }

    /// The region configuration.
    pub const fn config(&self) -> &QueueConfig {
        &self.config
    }

    #[inline]
    fn len(&self) -> usize {
        self.config.sector_count() as usize
    }

    #[inline]
    fn bytes(&self) -> &[u8; SIZE] {
        &self.entries
    }

    #[inline]
    fn bytes_mut(&mut self) -> &mut [u8; SIZE] {
        &mut self.entries
    }

    /// Raw table entries, signature slot first.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes()[..self.len()]
    }

    /// Read the map sector into the mirror.
    pub fn load<D>(&mut self, device: &mut D) -> Result<(), D::Error>
    where
        D: FlashDevice<SIZE, Align = A>,
    {
        let sector = self.config.map_sector();
        device.read_sector(sector, &mut self.entries)
    }

    /// Whether the signature slot carries the signature byte.
    pub fn is_formatted(&self) -> bool {
        self.bytes()[0] == SIGNATURE
    }

    /// Mark every data sector empty, set the signature and persist.
    ///
    /// Bytes past the last table entry are left erased.
    pub fn format<D>(&mut self, device: &mut D) -> Result<(), D::Error>
    where
        D: FlashDevice<SIZE, Align = A>,
    {
        let len = self.len();
        let bytes = self.bytes_mut();
        bytes.fill(SectorStatus::UNFORMATTED_BYTE);
        bytes[1..len].fill(SectorStatus::EMPTY_BYTE);
        bytes[0] = SIGNATURE;

        self.persist_full(device)
    }

    /// Erase the map sector and write the whole mirror back.
    ///
    /// Costs an erase cycle; only formatting and compaction use it.
    pub fn persist_full<D>(&mut self, device: &mut D) -> Result<(), D::Error>
    where
        D: FlashDevice<SIZE, Align = A>,
    {
        self.bytes_mut()[0] = SIGNATURE;

        let sector = self.config.map_sector();
        device.erase_sector(sector)?;
        device.write_sector(sector, &self.entries)
    }

    /// Status of a data sector, or `None` for the signature slot and
    /// out-of-range indices.
    pub fn status(&self, index: SectorIndex) -> Option<SectorStatus> {
        if index.is_data() && index.as_usize() < self.len() {
            Some(SectorStatus::from_byte(self.bytes()[index.as_usize()]))
        } else {
            None
        }
    }

    /// Program one status byte in place and verify it by reading it back.
    ///
    /// The mirror is only updated once the read-back matches. On a mismatch
    /// the mirror keeps its old value and `VerifyFailed` is returned; the
    /// map sector may then disagree with the mirror.
    pub fn set_status<D>(
        &mut self,
        device: &mut D,
        index: SectorIndex,
        status: SectorStatus,
    ) -> Result<(), QueueError<D::Error>>
    where
        D: FlashDevice<SIZE, Align = A>,
    {
        debug_assert!(index.is_data() && index.as_usize() < self.len());
        debug_assert!(
            self.status(index)
                .is_some_and(|current| current.is_programmable_to(status)),
            "status transition needs an erase"
        );

        let expected = status.to_byte();
        let address = self.config.status_address(index);

        device
            .write_byte(address, expected)
            .map_err(QueueError::Device)?;
        let found = device.read_byte(address).map_err(QueueError::Device)?;

        if found != expected {
            error!(
                "status write to sector {} failed: wrote {}, read {}",
                index.value(),
                expected,
                found
            );
            return Err(QueueError::VerifyFailed {
                index,
                expected,
                found,
            });
        }

        self.bytes_mut()[index.as_usize()] = expected;
        Ok(())
    }

    fn find(&self, wanted: SectorStatus) -> Option<SectorIndex> {
        let wanted = wanted.to_byte();
        self.bytes()[1..self.len()]
            .iter()
            .position(|&b| b == wanted)
            .map(|pos| SectorIndex::new(pos as u32 + 1))
    }

    /// Lowest-indexed empty sector, without compacting.
    pub fn find_writable(&self) -> Option<SectorIndex> {
        self.find(SectorStatus::Empty)
    }

    /// Lowest-indexed unread sector.
    pub fn find_readable(&self) -> Option<SectorIndex> {
        self.find(SectorStatus::Unread)
    }

    /// Turn every entry that is not unread back to empty, in the mirror only.
    ///
    /// This reclaims read sectors and anything unrecognized. Returns the
    /// number of entries that changed; the caller persists if it is non-zero.
    pub fn compact(&mut self) -> u32 {
        let len = self.len();
        let mut reclaimed = 0;
        for byte in &mut self.bytes_mut()[1..len] {
            if *byte != SectorStatus::UNREAD_BYTE && *byte != SectorStatus::EMPTY_BYTE {
                *byte = SectorStatus::EMPTY_BYTE;
                reclaimed += 1;
            }
        }
        reclaimed
    }

    /// Find a sector to write, compacting first if none is empty.
    ///
    /// Reclamation is deferred until no empty sector is left and then done
    /// in one map sector rewrite, however many sectors it frees.
    ///
    /// # Errors
    ///
    /// - `NoSpace` if every data sector is unread
    /// - `Device` if persisting the compacted table fails; the mirror is
    ///   then ahead of the map sector and the table should be reloaded
    pub fn allocate<D>(&mut self, device: &mut D) -> Result<Allocation, QueueError<D::Error>>
    where
        D: FlashDevice<SIZE, Align = A>,
    {
        if let Some(index) = self.find_writable() {
            return Ok(Allocation {
                index,
                reclaimed: 0,
            });
        }

        debug!("no empty sector left, compacting status table");
        let reclaimed = self.compact();
        if reclaimed == 0 {
            return Err(QueueError::NoSpace);
        }

        self.persist_full(device).map_err(QueueError::Device)?;
        info!("compaction reclaimed {} sectors", reclaimed);

        self.find_writable()
            .map(|index| Allocation { index, reclaimed })
            .ok_or(QueueError::NoSpace)
    }

    /// First data entry holding a byte outside {empty, unread, read}.
    pub fn scan_corruption(&self) -> Option<(SectorIndex, u8)> {
        self.bytes()[1..self.len()]
            .iter()
            .position(|&b| !SectorStatus::from_byte(b).is_valid())
            .map(|pos| (SectorIndex::new(pos as u32 + 1), self.bytes()[pos + 1]))
    }

    /// Count entries per state.
    pub fn summary(&self) -> StatusSummary {
        let mut summary = StatusSummary::default();
        for &byte in &self.bytes()[1..self.len()] {
            match SectorStatus::from_byte(byte) {
                SectorStatus::Empty => summary.empty += 1,
                SectorStatus::Unread => summary.unread += 1,
                SectorStatus::Read => summary.read += 1,
                SectorStatus::Unformatted | SectorStatus::Corrupted(_) => summary.corrupted += 1,
            }
        }
        summary
    }
}
