//! In-memory NOR flash simulator.
//!
//! `RamFlash` implements the `embedded-storage` NOR traits over a heap
//! buffer with real NOR semantics: erase sets a whole sector to `0xFF` and
//! programming can only clear bits. It counts erases per sector, which
//! makes wear behavior observable in tests.

use alloc::vec;
use alloc::vec::Vec;

use embedded_storage::nor_flash::{
    ErrorType, MultiwriteNorFlash, NorFlash, NorFlashErrorKind, ReadNorFlash,
};

/// Heap-backed NOR flash with `ERASE_SIZE`-byte sectors.
///
/// # Examples
///
/// ```
/// use embedded_storage::nor_flash::{NorFlash, ReadNorFlash};
/// use flashq::adapters::RamFlash;
///
/// let mut flash = RamFlash::<4096>::new(4);
/// flash.write(0, &[0x0F]).unwrap();
/// flash.write(0, &[0xF5]).unwrap();
///
/// let mut byte = [0u8];
/// flash.read(0, &mut byte).unwrap();
/// assert_eq!(byte[0], 0x05);
/// ```
#[derive(Debug, Clone)]
pub struct RamFlash<const ERASE_SIZE: usize> {
    data: Vec<u8>,
    erase_counts: Vec<u32>,
}

impl<const ERASE_SIZE: usize> RamFlash<ERASE_SIZE> {
    /// Create an erased flash of `sectors` sectors.
    pub fn new(sectors: usize) -> Self {
        Self {
            data: vec![0xFF; sectors * ERASE_SIZE],
            erase_counts: vec![0; sectors],
        }
    }

    /// Wrap an existing image, e.g. one loaded from a file.
    ///
    /// # Panics
    ///
    /// Panics if the image is not a whole number of sectors.
    pub fn from_image(data: Vec<u8>) -> Self {
        assert!(
            data.len() % ERASE_SIZE == 0,
            "image length must be a multiple of the sector size"
        );
        let sectors = data.len() / ERASE_SIZE;
        Self {
            data,
            erase_counts: vec![0; sectors],
        }
    }

    /// Raw contents of the whole device.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Raw contents, writable without NOR restrictions.
    ///
    /// Useful for simulating corruption or an interrupted operation.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// How many times `sector` has been erased.
    pub fn erase_count(&self, sector: usize) -> u32 {
        self.erase_counts.get(sector).copied().unwrap_or(0)
    }

    /// Erase counts of all sectors.
    pub fn erase_counts(&self) -> &[u32] {
        &self.erase_counts
    }

    /// Consume the flash and return its contents.
    pub fn into_image(self) -> Vec<u8> {
        self.data
    }

    fn check_range(&self, offset: u32, length: usize) -> Result<core::ops::Range<usize>, NorFlashErrorKind> {
        let start = offset as usize;
        let end = start
            .checked_add(length)
            .ok_or(NorFlashErrorKind::OutOfBounds)?;
        if end > self.data.len() {
            return Err(NorFlashErrorKind::OutOfBounds);
        }
        Ok(start..end)
    }
}

impl<const ERASE_SIZE: usize> ErrorType for RamFlash<ERASE_SIZE> {
    type Error = NorFlashErrorKind;
}

impl<const ERASE_SIZE: usize> ReadNorFlash for RamFlash<ERASE_SIZE> {
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let range = self.check_range(offset, bytes.len())?;
        bytes.copy_from_slice(&self.data[range]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.data.len()
    }
}

impl<const ERASE_SIZE: usize> NorFlash for RamFlash<ERASE_SIZE> {
    const WRITE_SIZE: usize = 1;
    const ERASE_SIZE: usize = ERASE_SIZE;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        if from > to {
            return Err(NorFlashErrorKind::OutOfBounds);
        }
        if from as usize % ERASE_SIZE != 0 || to as usize % ERASE_SIZE != 0 {
            return Err(NorFlashErrorKind::NotAligned);
        }
        let range = self.check_range(from, (to - from) as usize)?;

        let first = range.start / ERASE_SIZE;
        let last = range.end / ERASE_SIZE;
        self.data[range].fill(0xFF);
        for count in &mut self.erase_counts[first..last] {
            *count += 1;
        }
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        let range = self.check_range(offset, bytes.len())?;
        for (cell, byte) in self.data[range].iter_mut().zip(bytes) {
            *cell &= *byte;
        }
        Ok(())
    }
}

impl<const ERASE_SIZE: usize> MultiwriteNorFlash for RamFlash<ERASE_SIZE> {}
