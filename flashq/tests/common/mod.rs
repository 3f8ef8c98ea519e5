//! Shared fixtures for the flashq integration tests.

#![allow(dead_code)]

use aligned::{A4, Aligned};
use embedded_storage::nor_flash::{
    ErrorType, MultiwriteNorFlash, NorFlash, NorFlashErrorKind, ReadNorFlash,
};
use flashq::{
    FlashGeometry, NorFlashDevice, QueueConfig, QueueObserver, RamFlash, SectorIndex, SectorQueue,
};

pub const SECTOR: usize = 256;

pub type Payload = Aligned<A4, [u8; SECTOR]>;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Payload whose bytes are all `tag`.
pub fn payload(tag: u8) -> Payload {
    Aligned([tag; SECTOR])
}

pub fn empty_buffer() -> Payload {
    Aligned([0; SECTOR])
}

/// RamFlash wrapper that can drop bits at one address or fail erases.
pub struct FaultyFlash {
    pub inner: RamFlash<SECTOR>,
    /// Writes to this address leave the byte unchanged.
    pub stuck_address: Option<u32>,
    /// Every erase fails once this is set.
    pub fail_erase: bool,
}

impl FaultyFlash {
    pub fn new(sectors: usize) -> Self {
        Self {
            inner: RamFlash::new(sectors),
            stuck_address: None,
            fail_erase: false,
        }
    }
}

impl ErrorType for FaultyFlash {
    type Error = NorFlashErrorKind;
}

impl ReadNorFlash for FaultyFlash {
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        self.inner.read(offset, bytes)
    }

    fn capacity(&self) -> usize {
        self.inner.capacity()
    }
}

impl NorFlash for FaultyFlash {
    const WRITE_SIZE: usize = 1;
    const ERASE_SIZE: usize = SECTOR;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        if self.fail_erase {
            return Err(NorFlashErrorKind::Other);
        }
        self.inner.erase(from, to)
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        match self.stuck_address {
            Some(stuck) if (offset..offset + bytes.len() as u32).contains(&stuck) => {
                let mut patched = bytes.to_vec();
                patched[(stuck - offset) as usize] = 0xFF;
                self.inner.write(offset, &patched)
            }
            _ => self.inner.write(offset, bytes),
        }
    }
}

impl MultiwriteNorFlash for FaultyFlash {}

/// Observer event, recorded in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Formatted,
    WriteSelected(u32),
    ReadSelected(u32),
    Compacted(u32),
    VerifyFailed { index: u32, expected: u8, found: u8 },
    GeometryMismatch { configured: FlashGeometry, detected: FlashGeometry },
    CorruptionDetected { index: u32, byte: u8 },
}

#[derive(Debug, Default)]
pub struct EventLog {
    pub events: Vec<Event>,
}

impl EventLog {
    pub fn compactions(&self) -> Vec<u32> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Compacted(n) => Some(*n),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, wanted: &Event) -> usize {
        self.events.iter().filter(|e| *e == wanted).count()
    }
}

impl QueueObserver for EventLog {
    fn formatted(&mut self) {
        self.events.push(Event::Formatted);
    }

    fn write_sector_selected(&mut self, index: SectorIndex) {
        self.events.push(Event::WriteSelected(index.value()));
    }

    fn read_sector_selected(&mut self, index: SectorIndex) {
        self.events.push(Event::ReadSelected(index.value()));
    }

    fn compacted(&mut self, reclaimed: u32) {
        self.events.push(Event::Compacted(reclaimed));
    }

    fn verify_failed(&mut self, index: SectorIndex, expected: u8, found: u8) {
        self.events.push(Event::VerifyFailed {
            index: index.value(),
            expected,
            found,
        });
    }

    fn geometry_mismatch(&mut self, configured: FlashGeometry, detected: FlashGeometry) {
        self.events.push(Event::GeometryMismatch {
            configured,
            detected,
        });
    }

    fn corruption_detected(&mut self, index: SectorIndex, byte: u8) {
        self.events.push(Event::CorruptionDetected {
            index: index.value(),
            byte,
        });
    }
}

pub type RamQueue<O = ()> = SectorQueue<NorFlashDevice<RamFlash<SECTOR>>, SECTOR, O>;

/// Queue of `sectors` sectors (map sector included) placed after
/// `reserved` unused sectors of a flash that fits it exactly.
pub fn ram_queue(reserved: u32, sectors: u32) -> RamQueue {
    let flash = RamFlash::<SECTOR>::new((reserved + sectors) as usize);
    let config = QueueConfig::with_sector_count(reserved * SECTOR as u32, SECTOR as u32, sectors)
        .expect("valid config");
    SectorQueue::new(NorFlashDevice::new(flash), config).expect("matching sector size")
}

/// Take the flash back out of a queue.
pub fn into_flash<O>(queue: RamQueue<O>) -> RamFlash<SECTOR>
where
    O: QueueObserver,
{
    queue.into_inner().into_inner()
}

/// Rebuild a queue over an existing flash, as after a reboot.
pub fn reopen(flash: RamFlash<SECTOR>, config: QueueConfig) -> RamQueue {
    SectorQueue::new(NorFlashDevice::new(flash), config).expect("matching sector size")
}
