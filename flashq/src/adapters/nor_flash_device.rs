//! NOR flash device for embedded-storage traits
//!
//! This module provides an adapter that wraps types implementing the
//! `embedded-storage` NOR flash traits and exposes them as a `FlashDevice`.
//!
//! # Example
//!
//! ```ignore
//! use flashq::{NorFlashDevice, QueueConfig, SectorQueue};
//!
//! let spi_flash = W25q64::new(spi, cs);
//! let device = NorFlashDevice::new(spi_flash);
//! let mut queue = SectorQueue::<_, 4096>::new(device, QueueConfig::w25q64())?;
//! queue.initialize()?;
//! ```

use aligned::Aligned;
use embedded_storage::nor_flash::{
    MultiwriteNorFlash, NorFlash, NorFlashError, NorFlashErrorKind, ReadNorFlash,
};

use crate::domain::{ports::FlashDevice, value_objects::FlashGeometry};

/// Largest read or write granularity `read_byte`/`write_byte` can handle.
pub const MAX_WORD_SIZE: usize = 32;

/// Error type for NOR flash operations
///
/// Carries the kind reported by the wrapped driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NorFlashDeviceError(pub NorFlashErrorKind);

impl NorFlashDeviceError {
    /// The error kind reported by the driver.
    #[inline]
    pub fn kind(&self) -> NorFlashErrorKind {
        self.0
    }
}

impl core::fmt::Display for NorFlashDeviceError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "NOR flash error: {:?}", self.0)
    }
}

impl core::error::Error for NorFlashDeviceError {}

fn device_error<E: NorFlashError>(e: E) -> NorFlashDeviceError {
    NorFlashDeviceError(e.kind())
}

/// Adapter that wraps embedded-storage NOR flash as a `FlashDevice`
///
/// Sectors are numbered from the start of the chip, so sector `s` covers
/// bytes `s * SIZE .. (s + 1) * SIZE`. `SIZE` must be a multiple of the
/// driver's `ERASE_SIZE`.
///
/// Single-byte status updates rely on `MultiwriteNorFlash`: the byte is
/// programmed as part of a word whose other bytes are `0xFF`, which leaves
/// their contents untouched.
pub struct NorFlashDevice<F> {
    flash: F,
}

impl<F> NorFlashDevice<F> {
    /// Create a new NOR flash device
    pub fn new(flash: F) -> Self {
        Self { flash }
    }

    /// Get a reference to the underlying flash
    pub fn flash(&self) -> &F {
        &self.flash
    }

    /// Get mutable access to the underlying flash
    pub fn flash_mut(&mut self) -> &mut F {
        &mut self.flash
    }

    /// Consume the adapter and return the underlying flash
    pub fn into_inner(self) -> F {
        self.flash
    }
}

impl<F: MultiwriteNorFlash> NorFlashDevice<F> {
    fn sector_offset<const SIZE: usize>(&self, sector: u32) -> Result<u32, NorFlashDeviceError> {
        if SIZE % F::ERASE_SIZE != 0 {
            return Err(NorFlashDeviceError(NorFlashErrorKind::NotAligned));
        }
        sector
            .checked_mul(SIZE as u32)
            .ok_or(NorFlashDeviceError(NorFlashErrorKind::OutOfBounds))
    }

    /// Start of the word containing `address`, for a word of `word` bytes.
    fn word_start(address: u32, word: usize) -> Result<u32, NorFlashDeviceError> {
        if word > MAX_WORD_SIZE {
            return Err(NorFlashDeviceError(NorFlashErrorKind::NotAligned));
        }
        Ok(address - address % word as u32)
    }
}

impl<F, const SIZE: usize> FlashDevice<SIZE> for NorFlashDevice<F>
where
    F: MultiwriteNorFlash,
{
    type Error = NorFlashDeviceError;
    type Align = aligned::A4; // 4-byte alignment typical for flash

    fn geometry(&mut self) -> Result<FlashGeometry, Self::Error> {
        Ok(FlashGeometry::from_capacity(
            self.flash.capacity() as u64,
            F::ERASE_SIZE as u32,
        ))
    }

    fn read_sector(
        &mut self,
        sector: u32,
        data: &mut Aligned<Self::Align, [u8; SIZE]>,
    ) -> Result<(), Self::Error> {
        let offset = self.sector_offset::<SIZE>(sector)?;
        self.flash
            .read(offset, &mut data[..])
            .map_err(device_error)
    }

    fn write_sector(
        &mut self,
        sector: u32,
        data: &Aligned<Self::Align, [u8; SIZE]>,
    ) -> Result<(), Self::Error> {
        let offset = self.sector_offset::<SIZE>(sector)?;
        self.flash.write(offset, &data[..]).map_err(device_error)
    }

    fn erase_sector(&mut self, sector: u32) -> Result<(), Self::Error> {
        let offset = self.sector_offset::<SIZE>(sector)?;
        let end = offset
            .checked_add(SIZE as u32)
            .ok_or(NorFlashDeviceError(NorFlashErrorKind::OutOfBounds))?;
        self.flash.erase(offset, end).map_err(device_error)
    }

    fn read_byte(&mut self, address: u32) -> Result<u8, Self::Error> {
        let word = F::READ_SIZE;
        let start = Self::word_start(address, word)?;
        let mut buf = [0u8; MAX_WORD_SIZE];
        self.flash
            .read(start, &mut buf[..word])
            .map_err(device_error)?;
        Ok(buf[(address - start) as usize])
    }

    fn write_byte(&mut self, address: u32, value: u8) -> Result<(), Self::Error> {
        let word = F::WRITE_SIZE;
        let start = Self::word_start(address, word)?;
        let mut buf = [0xFFu8; MAX_WORD_SIZE];
        buf[(address - start) as usize] = value;
        self.flash.write(start, &buf[..word]).map_err(device_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_storage::nor_flash::ErrorType;

    const SECTOR: usize = 256;

    /// Mock NOR flash with 4-byte program words
    struct MockFlash {
        data: [[u8; SECTOR]; 4],
        writes: usize,
    }

    impl MockFlash {
        fn new() -> Self {
            Self {
                data: [[0xFF; SECTOR]; 4],
                writes: 0,
            }
        }
    }

    impl ErrorType for MockFlash {
        type Error = NorFlashErrorKind;
    }

    impl ReadNorFlash for MockFlash {
        const READ_SIZE: usize = 1;

        fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
            let page = offset as usize / SECTOR;
            let page_offset = offset as usize % SECTOR;
            if page < self.data.len() && page_offset + bytes.len() <= SECTOR {
                bytes.copy_from_slice(&self.data[page][page_offset..page_offset + bytes.len()]);
                Ok(())
            } else {
                Err(NorFlashErrorKind::OutOfBounds)
            }
        }

        fn capacity(&self) -> usize {
            self.data.len() * SECTOR
        }
    }

    impl NorFlash for MockFlash {
        const WRITE_SIZE: usize = 4;
        const ERASE_SIZE: usize = SECTOR;

        fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
            let start_page = from as usize / SECTOR;
            let end_page = (to as usize).div_ceil(SECTOR);
            for page in start_page..end_page.min(self.data.len()) {
                self.data[page] = [0xFF; SECTOR];
            }
            Ok(())
        }

        fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
            if offset as usize % Self::WRITE_SIZE != 0 || bytes.len() % Self::WRITE_SIZE != 0 {
                return Err(NorFlashErrorKind::NotAligned);
            }
            let page = offset as usize / SECTOR;
            let page_offset = offset as usize % SECTOR;
            if page >= self.data.len() || page_offset + bytes.len() > SECTOR {
                return Err(NorFlashErrorKind::OutOfBounds);
            }
            for (dst, src) in self.data[page][page_offset..].iter_mut().zip(bytes) {
                *dst &= *src;
            }
            self.writes += 1;
            Ok(())
        }
    }

    impl MultiwriteNorFlash for MockFlash {}

    #[test]
    fn test_sector_read_write() {
        let mut device = NorFlashDevice::new(MockFlash::new());

        let data: Aligned<aligned::A4, [u8; SECTOR]> = Aligned([0xA5; SECTOR]);
        FlashDevice::<SECTOR>::write_sector(&mut device, 2, &data).unwrap();

        let mut read: Aligned<aligned::A4, [u8; SECTOR]> = Aligned([0; SECTOR]);
        device.read_sector(2, &mut read).unwrap();
        assert_eq!(read[..], data[..]);
        assert!(device.flash().data[1].iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_erase_and_blank_check() {
        let mut device = NorFlashDevice::new(MockFlash::new());
        device.flash_mut().data[1][17] = 0x00;

        assert!(!FlashDevice::<SECTOR>::is_sector_blank(&mut device, 1).unwrap());
        FlashDevice::<SECTOR>::erase_sector(&mut device, 1).unwrap();
        assert!(FlashDevice::<SECTOR>::is_sector_blank(&mut device, 1).unwrap());
    }

    #[test]
    fn test_write_byte_pads_word() {
        let mut device = NorFlashDevice::new(MockFlash::new());
        device.flash_mut().data[0][4..8].copy_from_slice(&[0x5F, 0x5E, 0x5F, 0x5F]);

        FlashDevice::<SECTOR>::write_byte(&mut device, 6, 0x5E).unwrap();

        assert_eq!(device.flash().data[0][4..8], [0x5F, 0x5E, 0x5E, 0x5F]);
        assert_eq!(device.flash().writes, 1);
        assert_eq!(FlashDevice::<SECTOR>::read_byte(&mut device, 6).unwrap(), 0x5E);
    }

    #[test]
    fn test_geometry() {
        let mut device = NorFlashDevice::new(MockFlash::new());
        let geometry = FlashDevice::<SECTOR>::geometry(&mut device).unwrap();

        assert_eq!(geometry.sector_count, 4);
        assert_eq!(geometry.sector_size, SECTOR as u32);
        assert_eq!(geometry.capacity_kb, 1);
    }

    #[test]
    fn test_sector_smaller_than_erase_unit() {
        let mut device = NorFlashDevice::new(MockFlash::new());
        let result = FlashDevice::<128>::erase_sector(&mut device, 0);
        assert_eq!(result, Err(NorFlashDeviceError(NorFlashErrorKind::NotAligned)));
    }

    #[test]
    fn test_out_of_bounds() {
        let mut device = NorFlashDevice::new(MockFlash::new());
        let mut buf: Aligned<aligned::A4, [u8; SECTOR]> = Aligned([0; SECTOR]);
        let err = device.read_sector(9, &mut buf).unwrap_err();
        assert_eq!(err.kind(), NorFlashErrorKind::OutOfBounds);
    }
}
