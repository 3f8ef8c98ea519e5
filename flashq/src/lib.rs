//! Wear-leveling sector queue for raw NOR flash.
//!
//! A reserved region of flash is treated as a FIFO of sector-sized payloads.
//! The first sector of the region (the map sector) holds one status byte per
//! data sector; pushes and pops update a single byte in place, and erase
//! cycles are spent only when every data sector has been used once.
//!
//! # Architecture
//!
//! The crate is organized into two layers:
//!
//! ## Domain Layer (`domain`)
//! Queue logic with no infrastructure dependencies:
//! - **Entities**: `SectorStatus` with its byte encoding
//! - **Value Objects**: `SectorIndex`, `FlashGeometry`, `QueueConfig`
//! - **Services**: `StatusTable` (allocation, compaction) and `SectorQueue`
//! - **Ports**: `FlashDevice` and `QueueObserver` interfaces
//!
//! ## Adapter Layer (`adapters`)
//! Concrete implementations connecting domain to infrastructure:
//! - **`NorFlashDevice`**: Implements `FlashDevice` using `embedded-storage`
//! - **`RamFlash`**: In-memory NOR flash (requires `alloc`)
//!
//! # Quick Start
//!
//! ```
//! use aligned::{A4, Aligned};
//! use flashq::{NorFlashDevice, QueueConfig, RamFlash, SectorQueue};
//!
//! let flash = RamFlash::<4096>::new(8);
//! let config = QueueConfig::with_sector_count(0, 4096, 8).unwrap();
//! let mut queue = SectorQueue::<_, 4096>::new(NorFlashDevice::new(flash), config).unwrap();
//! queue.initialize().unwrap();
//!
//! let payload: Aligned<A4, [u8; 4096]> = Aligned([0x42; 4096]);
//! queue.push(&payload).unwrap();
//!
//! let mut out: Aligned<A4, [u8; 4096]> = Aligned([0; 4096]);
//! queue.pop(&mut out).unwrap();
//! assert_eq!(out[0], 0x42);
//! assert!(queue.pop(&mut out).unwrap_err().is_no_data());
//! ```
//!
//! # Features
//!
//! - `embedded-storage`: Enable `NorFlashDevice` (default)
//! - `alloc`: Enable `RamFlash` (default)
//! - `std`: Enable standard library features
//! - `log`: Enable logging support
//! - `defmt`: Enable defmt logging for embedded

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]

#[cfg(feature = "alloc")]
extern crate alloc;

// This mod MUST go first, so that the others see its macros.
#[macro_use]
mod fmt;

// Core layers
pub mod adapters;
pub mod domain;

// Re-export commonly used types for convenience
pub use domain::{
    ConfigError, CorruptionPolicy, FlashDevice, FlashGeometry, GeometryPolicy, QueueConfig,
    QueueError, QueueObserver, SECTOR_SIZE_4K, SectorIndex, SectorQueue, SectorStatus,
    StatusSummary,
};

#[cfg(feature = "embedded-storage")]
pub use adapters::{NorFlashDevice, NorFlashDeviceError};

#[cfg(all(feature = "alloc", feature = "embedded-storage"))]
pub use adapters::RamFlash;
