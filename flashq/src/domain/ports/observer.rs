//! QueueObserver port - hooks for diagnostics.

use crate::domain::value_objects::{FlashGeometry, SectorIndex};

/// Observer notified at fixed points of queue operation.
///
/// All methods have empty default bodies. Hooks receive plain values and
/// return nothing, so an observer cannot change what an operation returns.
/// `()` is the no-op observer used when none is installed.
///
/// # Examples
///
/// ```
/// use flashq::domain::QueueObserver;
///
/// #[derive(Default)]
/// struct CompactionCounter(usize);
///
/// impl QueueObserver for CompactionCounter {
///     fn compacted(&mut self, _reclaimed: u32) {
///         self.0 += 1;
///     }
/// }
/// ```
pub trait QueueObserver {
    /// The status table was (re)formatted.
    fn formatted(&mut self) {}

    /// A sector was chosen for the next push.
    fn write_sector_selected(&mut self, _index: SectorIndex) {}

    /// A sector was chosen for the next pop or peek.
    fn read_sector_selected(&mut self, _index: SectorIndex) {}

    /// A compaction rewrote the map sector, turning `reclaimed` entries back to empty.
    fn compacted(&mut self, _reclaimed: u32) {}

    /// A status byte did not read back as written.
    fn verify_failed(&mut self, _index: SectorIndex, _expected: u8, _found: u8) {}

    /// The device reported a geometry different from the configuration.
    fn geometry_mismatch(&mut self, _configured: FlashGeometry, _detected: FlashGeometry) {}

    /// An unrecognized status byte was found while loading the table.
    fn corruption_detected(&mut self, _index: SectorIndex, _byte: u8) {}
}

impl QueueObserver for () {}

impl<T: QueueObserver + ?Sized> QueueObserver for &mut T {
    fn formatted(&mut self) {
        (**self).formatted()
    }

    fn write_sector_selected(&mut self, index: SectorIndex) {
        (**self).write_sector_selected(index)
    }

    fn read_sector_selected(&mut self, index: SectorIndex) {
        (**self).read_sector_selected(index)
    }

    fn compacted(&mut self, reclaimed: u32) {
        (**self).compacted(reclaimed)
    }

    fn verify_failed(&mut self, index: SectorIndex, expected: u8, found: u8) {
        (**self).verify_failed(index, expected, found)
    }

    fn geometry_mismatch(&mut self, configured: FlashGeometry, detected: FlashGeometry) {
        (**self).geometry_mismatch(configured, detected)
    }

    fn corruption_detected(&mut self, index: SectorIndex, byte: u8) {
        (**self).corruption_detected(index, byte)
    }
}
