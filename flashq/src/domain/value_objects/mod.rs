//! Value objects for the domain layer.
//!
//! Value objects are immutable, validated data types that represent
//! concepts in the domain model. They keep table indices, absolute sector
//! numbers and byte addresses from being mixed up.

mod sector_index;
mod geometry;
mod queue_config;

pub use sector_index::SectorIndex;
pub use geometry::{FlashGeometry, KILOBYTE};
pub use queue_config::{ConfigError, CorruptionPolicy, GeometryPolicy, QueueConfig, SECTOR_SIZE_4K};
