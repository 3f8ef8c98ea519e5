//! SectorQueue domain service - the push/pop controller.
//!
//! `SectorQueue` owns the flash device, the status table mirror and an
//! optional observer. All state lives in the instance, so independent
//! queues (e.g. one per test) never interfere.

use aligned::Aligned;

use crate::domain::{
    entities::SectorStatus,
    error::QueueError,
    ports::{FlashDevice, QueueObserver},
    status_table::{StatusSummary, StatusTable},
    value_objects::{ConfigError, CorruptionPolicy, GeometryPolicy, QueueConfig, SectorIndex},
};

/// Wear-leveling FIFO of sector-sized payloads on raw NOR flash.
///
/// Each push lands in the lowest-indexed empty data sector and each pop
/// delivers the lowest-indexed unread one. Popped sectors are not erased
/// right away: once no empty sector is left, a single rewrite of the map
/// sector turns every read sector back to empty.
///
/// # Lifecycle per data sector
///
/// ```text
/// EMPTY --push--> UNREAD --pop--> READ --compaction--> EMPTY
/// ```
///
/// # Delivery order
///
/// Selection is by ascending index, not by push time. After a compaction a
/// new payload can land below an older unread one and is then delivered
/// first.
///
/// # Interruption
///
/// Neither push nor pop is atomic. A push interrupted between the data
/// write and the status update leaves the sector marked empty, and the
/// payload is lost when the sector is reused. A pop interrupted before its
/// status update delivers the same payload again on the next pop.
///
/// # Type Parameters
///
/// - `D`: The flash device (must implement `FlashDevice`)
/// - `SIZE`: Sector size in bytes, which is also the payload size
/// - `O`: Observer receiving diagnostic callbacks (`()` for none)
///
/// # Examples
///
/// ```ignore
/// use aligned::Aligned;
/// use flashq::{NorFlashDevice, QueueConfig, SectorQueue};
///
/// let device = NorFlashDevice::new(spi_flash);
/// let mut queue = SectorQueue::<_, 4096>::new(device, QueueConfig::w25q64())?;
/// queue.initialize()?;
///
/// let record = Aligned([0x42u8; 4096]);
/// queue.push(&record)?;
///
/// let mut out = Aligned([0u8; 4096]);
/// queue.pop(&mut out)?;
/// ```
pub struct SectorQueue<D, const SIZE: usize, O = ()>
where
    D: FlashDevice<SIZE>,
{
    device: D,
    table: StatusTable<D::Align, SIZE>,
    observer: O,
    /// The mirror holds a signed table read from (or written to) flash.
    signed: bool,
    initialized: bool,
}

impl<D, const SIZE: usize> SectorQueue<D, SIZE>
where
    D: FlashDevice<SIZE>,
{
    /// Create a queue over `device`. Nothing touches the flash until
    /// [`initialize`](Self::initialize) is called.
    ///
    /// # Errors
    ///
    /// Returns `SectorSizeMismatch` if the configured sector size is not `SIZE`.
    pub fn new(device: D, config: QueueConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            device,
            table: StatusTable::new(config)?,
            observer: (),
            signed: false,
            initialized: false,
        })
    }
}

impl<D, const SIZE: usize, O> SectorQueue<D, SIZE, O>
where
    D: FlashDevice<SIZE>,
    O: QueueObserver,
{
    /// Replace the observer.
    pub fn with_observer<P: QueueObserver>(self, observer: P) -> SectorQueue<D, SIZE, P> {
        SectorQueue {
            device: self.device,
            table: self.table,
            observer,
            signed: self.signed,
            initialized: self.initialized,
        }
    }

    /// Bring up the device and load (or create) the status table.
    ///
    /// Steps: device init, geometry check, map sector load, format if the
    /// signature is missing, corruption scan. Must succeed before any other
    /// operation; calling it again reloads the table from flash.
    ///
    /// # Errors
    ///
    /// - `DeviceInit` if the device does not come up
    /// - `GeometryTooSmall` if the device cannot hold the configured region
    /// - `GeometryMismatch` under `GeometryPolicy::Strict`
    /// - `CorruptedStatus` under `CorruptionPolicy::Fail`
    /// - `VerifyFailed` if a fresh format does not read back
    /// - `Device` on any other device failure
    pub fn initialize(&mut self) -> Result<(), QueueError<D::Error>> {
        self.initialized = false;
        self.signed = false;

        self.device.init().map_err(QueueError::DeviceInit)?;
        self.check_geometry()?;

        self.table
            .load(&mut self.device)
            .map_err(QueueError::Device)?;

        if !self.table.is_formatted() {
            warn!(
                "signature byte {} not found, formatting status table",
                self.table.as_bytes()[0]
            );
            self.format_table()?;
            self.table
                .load(&mut self.device)
                .map_err(QueueError::Device)?;

            if !self.table.is_formatted() {
                return Err(QueueError::VerifyFailed {
                    index: SectorIndex::SIGNATURE,
                    expected: crate::domain::entities::SIGNATURE,
                    found: self.table.as_bytes()[0],
                });
            }
        }
        self.signed = true;

        if let Some((index, byte)) = self.table.scan_corruption() {
            self.observer.corruption_detected(index, byte);
            match self.table.config().corruption_policy() {
                CorruptionPolicy::Fail => {
                    error!("corrupted status byte {} at sector {}", byte, index.value());
                    return Err(QueueError::CorruptedStatus { index, byte });
                }
                CorruptionPolicy::Reclaim => {
                    warn!(
                        "corrupted status byte {} at sector {}, will be reclaimed",
                        byte,
                        index.value()
                    );
                }
            }
        }

        let summary = self.table.summary();
        info!(
            "flash queue ready: {} unread, {} read, {} empty of {} sectors",
            summary.unread,
            summary.read,
            summary.empty,
            self.capacity()
        );

        self.initialized = true;
        Ok(())
    }

    fn check_geometry(&mut self) -> Result<(), QueueError<D::Error>> {
        let config = *self.table.config();
        let detected = self.device.geometry().map_err(QueueError::Device)?;

        let required = config.required_bytes();
        let available = detected.capacity_bytes();
        if available < required {
            error!(
                "flash too small: need {} bytes, device has {}",
                required, available
            );
            return Err(QueueError::GeometryTooSmall {
                required,
                available,
            });
        }

        let configured = config.geometry();
        if detected != configured {
            self.observer.geometry_mismatch(configured, detected);
            match config.geometry_policy() {
                GeometryPolicy::Strict => {
                    return Err(QueueError::GeometryMismatch {
                        configured,
                        detected,
                    });
                }
                GeometryPolicy::Warn => {
                    warn!(
                        "detected {} KB / {} byte sectors, configured {} KB / {} byte sectors; proceeding with configured",
                        detected.capacity_kb,
                        detected.sector_size,
                        configured.capacity_kb,
                        configured.sector_size
                    );
                }
            }
        }

        Ok(())
    }

    fn ensure_initialized(&self) -> Result<(), QueueError<D::Error>> {
        if self.initialized {
            Ok(())
        } else {
            Err(QueueError::NotInitialized)
        }
    }

    fn format_table(&mut self) -> Result<(), QueueError<D::Error>> {
        if let Err(e) = self.table.format(&mut self.device) {
            // The map sector may be half written; force a reload
            self.initialized = false;
            self.signed = false;
            return Err(QueueError::Device(e));
        }

        info!(
            "status table formatted with {} data sectors",
            self.table.config().data_sectors()
        );
        self.observer.formatted();
        Ok(())
    }

    /// Discard every payload and mark all data sectors empty.
    ///
    /// Data sectors are not erased; each is erased lazily on its next push.
    ///
    /// Only needs the table to have been loaded, so it also recovers a queue
    /// whose `initialize` failed with `CorruptedStatus`. On success the
    /// queue is ready for use.
    pub fn format(&mut self) -> Result<(), QueueError<D::Error>> {
        if !self.signed {
            return Err(QueueError::NotInitialized);
        }
        self.format_table()?;
        self.initialized = true;
        Ok(())
    }

    fn set_status(
        &mut self,
        index: SectorIndex,
        status: SectorStatus,
    ) -> Result<(), QueueError<D::Error>> {
        let result = self.table.set_status(&mut self.device, index, status);
        if let Err(QueueError::VerifyFailed {
            index,
            expected,
            found,
        }) = &result
        {
            self.observer.verify_failed(*index, *expected, *found);
        }
        result
    }

    /// Store one sector-sized payload.
    ///
    /// Returns the table index the payload was written to.
    ///
    /// # Errors
    ///
    /// - `NoSpace` if every data sector holds an unread payload
    /// - `VerifyFailed` if the status update did not read back; the payload
    ///   is on flash but the sector is still marked empty
    /// - `Device` on device failure
    pub fn push(
        &mut self,
        payload: &Aligned<D::Align, [u8; SIZE]>,
    ) -> Result<SectorIndex, QueueError<D::Error>> {
        self.ensure_initialized()?;

        let allocation = match self.table.allocate(&mut self.device) {
            Ok(allocation) => allocation,
            Err(QueueError::Device(e)) => {
                // Compaction failed to persist; the mirror is ahead of flash
                self.initialized = false;
                return Err(QueueError::Device(e));
            }
            Err(e) => return Err(e),
        };

        if allocation.reclaimed > 0 {
            self.observer.compacted(allocation.reclaimed);
        }

        let index = allocation.index;
        self.observer.write_sector_selected(index);
        debug!("pushing to sector {}", index.value());

        let sector = self.table.config().data_sector(index);
        let blank = self
            .device
            .is_sector_blank(sector)
            .map_err(QueueError::Device)?;
        if !blank {
            trace!("erasing data sector {} before write", sector);
            self.device
                .erase_sector(sector)
                .map_err(QueueError::Device)?;
        }
        self.device
            .write_sector(sector, payload)
            .map_err(QueueError::Device)?;

        self.set_status(index, SectorStatus::Unread)?;
        Ok(index)
    }

    fn read_next(
        &mut self,
        buffer: &mut Aligned<D::Align, [u8; SIZE]>,
    ) -> Result<SectorIndex, QueueError<D::Error>> {
        self.ensure_initialized()?;

        let index = self.table.find_readable().ok_or(QueueError::NoData)?;
        self.observer.read_sector_selected(index);
        debug!("reading from sector {}", index.value());

        let sector = self.table.config().data_sector(index);
        self.device
            .read_sector(sector, buffer)
            .map_err(QueueError::Device)?;
        Ok(index)
    }

    /// Take the next payload out of the queue.
    ///
    /// Returns the table index the payload was read from.
    ///
    /// # Errors
    ///
    /// - `NoData` if no sector holds an unread payload
    /// - `VerifyFailed` if the status update did not read back; `buffer`
    ///   holds the payload but it will be delivered again
    /// - `Device` on device failure
    pub fn pop(
        &mut self,
        buffer: &mut Aligned<D::Align, [u8; SIZE]>,
    ) -> Result<SectorIndex, QueueError<D::Error>> {
        let index = self.read_next(buffer)?;
        self.set_status(index, SectorStatus::Read)?;
        Ok(index)
    }

    /// Read the payload the next pop would return, without consuming it.
    pub fn peek(
        &mut self,
        buffer: &mut Aligned<D::Align, [u8; SIZE]>,
    ) -> Result<SectorIndex, QueueError<D::Error>> {
        self.read_next(buffer)
    }

    /// Whether `initialize` has completed.
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Number of data sectors, the most payloads the queue can hold.
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.table.config().data_sectors()
    }

    /// Number of payloads waiting to be popped.
    pub fn len(&self) -> u32 {
        self.table.summary().unread
    }

    /// Check if there is nothing to pop.
    pub fn is_empty(&self) -> bool {
        self.table.find_readable().is_none()
    }

    /// How many more payloads can be pushed, counting sectors a compaction
    /// would reclaim.
    pub fn free_sectors(&self) -> u32 {
        self.capacity() - self.len()
    }

    /// Per-state counts of the status table.
    pub fn summary(&self) -> StatusSummary {
        self.table.summary()
    }

    /// Status of a single data sector.
    pub fn status_of(&self, index: SectorIndex) -> Option<SectorStatus> {
        self.table.status(index)
    }

    /// The status table mirror.
    pub fn status_table(&self) -> &StatusTable<D::Align, SIZE> {
        &self.table
    }

    /// The region configuration.
    pub fn config(&self) -> &QueueConfig {
        self.table.config()
    }

    /// The installed observer.
    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Get a reference to the device.
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Get a mutable reference to the device.
    ///
    /// Writing to the queue region behind the queue's back desynchronizes
    /// the status table mirror; call `initialize` again afterwards.
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Consume the queue and return the device.
    pub fn into_inner(self) -> D {
        self.device
    }
}
