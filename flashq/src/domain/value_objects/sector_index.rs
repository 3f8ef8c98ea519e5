//! Type-safe status table index.

use core::fmt;

/// An index into the status table.
///
/// Index 0 is the signature slot and never names a data sector; indices
/// `1..N` map one-to-one to data sectors of the queue region. Keeping this
/// distinct from absolute sector numbers and byte addresses prevents mixing
/// the three up.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectorIndex(u32);

impl SectorIndex {
    /// The signature slot.
    pub const SIGNATURE: Self = Self(0);

    /// The first index that maps to a data sector.
    pub const FIRST_DATA: Self = Self(1);

    /// Create a new sector index.
    ///
    /// # Examples
    ///
    /// ```
    /// use flashq::domain::SectorIndex;
    ///
    /// let index = SectorIndex::new(3);
    /// assert_eq!(index.value(), 3);
    /// assert!(index.is_data());
    /// ```
    #[inline]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Get the underlying u32 value.
    #[inline]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Whether this index names a data sector rather than the signature slot.
    #[inline]
    pub const fn is_data(self) -> bool {
        self.0 != 0
    }

    /// The index as a table offset.
    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SectorIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sector({})", self.0)
    }
}

impl From<u32> for SectorIndex {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl From<SectorIndex> for u32 {
    fn from(index: SectorIndex) -> Self {
        index.value()
    }
}
