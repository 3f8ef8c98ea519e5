//! Sector status codes persisted in the map sector.

/// Signature byte stored in slot 0 of a formatted status table.
pub const SIGNATURE: u8 = 0b0101_0101;

/// The status of a data sector, as persisted in the map sector.
///
/// Sectors move through these states:
/// - Empty: writable, holds no live payload
/// - Unread: holds a payload that has not been popped yet
/// - Read: payload was delivered, sector can be reclaimed
///
/// The encodings are chosen so that `Empty -> Unread -> Read` only ever
/// clears bits. NOR flash can program those transitions in place; going
/// back to `Empty` needs the map sector to be erased and rewritten.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SectorStatus {
    /// Erased byte, the table has never been formatted here.
    #[default]
    Unformatted,
    /// Writable.
    Empty,
    /// Holds undelivered data.
    Unread,
    /// Delivered, reclaimable on the next compaction.
    Read,
    /// Any byte outside the known encodings.
    Corrupted(u8),
}

impl SectorStatus {
    /// Raw byte for [`SectorStatus::Unformatted`].
    pub const UNFORMATTED_BYTE: u8 = 0b1111_1111;
    /// Raw byte for [`SectorStatus::Empty`].
    pub const EMPTY_BYTE: u8 = 0b0101_1111;
    /// Raw byte for [`SectorStatus::Unread`].
    pub const UNREAD_BYTE: u8 = 0b0101_1110;
    /// Raw byte for [`SectorStatus::Read`].
    pub const READ_BYTE: u8 = 0b0101_1100;

    /// Decode a persisted status byte.
    #[inline]
    pub const fn from_byte(byte: u8) -> Self {
        match byte {
            Self::UNFORMATTED_BYTE => Self::Unformatted,
            Self::EMPTY_BYTE => Self::Empty,
            Self::UNREAD_BYTE => Self::Unread,
            Self::READ_BYTE => Self::Read,
            other => Self::Corrupted(other),
        }
    }

    /// Encode for persistence.
    #[inline]
    pub const fn to_byte(self) -> u8 {
        match self {
            Self::Unformatted => Self::UNFORMATTED_BYTE,
            Self::Empty => Self::EMPTY_BYTE,
            Self::Unread => Self::UNREAD_BYTE,
            Self::Read => Self::READ_BYTE,
            Self::Corrupted(byte) => byte,
        }
    }

    /// Whether this is one of the states a formatted table may hold.
    #[inline]
    pub const fn is_valid(self) -> bool {
        matches!(self, Self::Empty | Self::Unread | Self::Read)
    }

    /// Check if the sector can take a new payload.
    #[inline]
    pub const fn is_empty(self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Check if the sector holds an undelivered payload.
    #[inline]
    pub const fn is_unread(self) -> bool {
        matches!(self, Self::Unread)
    }

    /// Whether `next` can be programmed over this status without an erase.
    ///
    /// NOR programming can only clear bits, so every bit set in `next`
    /// must already be set here.
    #[inline]
    pub const fn is_programmable_to(self, next: SectorStatus) -> bool {
        next.to_byte() & !self.to_byte() == 0
    }
}

impl From<u8> for SectorStatus {
    fn from(byte: u8) -> Self {
        Self::from_byte(byte)
    }
}

impl From<SectorStatus> for u8 {
    fn from(status: SectorStatus) -> Self {
        status.to_byte()
    }
}

impl core::fmt::Display for SectorStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Unformatted => write!(f, "UNFORMATTED"),
            Self::Empty => write!(f, "EMPTY"),
            Self::Unread => write!(f, "UNREAD"),
            Self::Read => write!(f, "READ"),
            Self::Corrupted(byte) => write!(f, "CORRUPTED({:#04x})", byte),
        }
    }
}
