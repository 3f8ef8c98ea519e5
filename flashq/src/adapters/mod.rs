//! Adapter layer - Concrete implementations connecting domain to infrastructure.
//!
//! This layer contains adapters that implement the domain's ports, connecting
//! the queue logic to actual flash hardware or a simulation of it.
//!
//! # Hexagonal Architecture
//!
//! ```text
//!     ┌──────────────────────────────────┐
//!     │      Domain Layer                │
//!     │  - SectorQueue (service)         │
//!     │  - FlashDevice (port)            │
//!     └────────────┬─────────────────────┘
//!                  │
//!                  │ implements
//!                  ▼
//!     ┌──────────────────────────────────┐
//!     │      Adapter Layer               │  ◄── This module
//!     │  - NorFlashDevice                │
//!     │  - RamFlash                      │
//!     └────────────┬─────────────────────┘
//!                  │
//!                  │ uses
//!                  ▼
//!     ┌──────────────────────────────────┐
//!     │  Infrastructure (NOR driver)     │
//!     └──────────────────────────────────┘
//! ```
//!
//! # Available Adapters
//!
//! - **`NorFlashDevice`**: Adapts `embedded-storage` `MultiwriteNorFlash` to the `FlashDevice` port
//! - **`RamFlash`**: Heap-backed NOR simulator with erase counting (requires `alloc`)

#[cfg(feature = "embedded-storage")]
mod nor_flash_device;

#[cfg(all(feature = "alloc", feature = "embedded-storage"))]
mod ram_flash;

#[cfg(feature = "embedded-storage")]
pub use nor_flash_device::{MAX_WORD_SIZE, NorFlashDevice, NorFlashDeviceError};

#[cfg(all(feature = "alloc", feature = "embedded-storage"))]
pub use ram_flash::RamFlash;
