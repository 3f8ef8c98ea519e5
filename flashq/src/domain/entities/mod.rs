//! Domain entities for the sector queue.
//!
//! The only entity with a lifecycle is the per-sector status, which walks
//! `Empty -> Unread -> Read -> Empty` as payloads are pushed, popped and
//! reclaimed.

mod sector_status;

pub use sector_status::{SectorStatus, SIGNATURE};
