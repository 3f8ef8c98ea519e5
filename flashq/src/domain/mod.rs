//! Domain layer - queue logic with zero infrastructure dependencies.
//!
//! The domain layer contains:
//! - **Entities**: `SectorStatus`, the per-sector state byte
//! - **Value Objects**: `SectorIndex`, `FlashGeometry`, `QueueConfig`
//! - **Domain Services**: `StatusTable` (allocator and reader) and `SectorQueue`
//! - **Ports**: `FlashDevice` and `QueueObserver`
//! - **Domain Errors**: `QueueError`
//!
//! # Hexagonal Architecture
//!
//! ```text
//!     ┌──────────────────────────────────┐
//!     │      Domain Layer (Core)         │
//!     │                                  │
//!     │  ┌────────────────────────────┐  │
//!     │  │  Entities & Value Objects  │  │
//!     │  │  - SectorStatus            │  │
//!     │  │  - SectorIndex, QueueConfig│  │
//!     │  └────────────────────────────┘  │
//!     │              ▲                   │
//!     │              │                   │
//!     │  ┌────────────────────────────┐  │
//!     │  │    Domain Services         │  │
//!     │  │    - StatusTable           │  │
//!     │  │    - SectorQueue           │  │
//!     │  └────────────────────────────┘  │
//!     │              │                   │
//!     │              ▼                   │
//!     │  ┌────────────────────────────┐  │
//!     │  │    Ports (Interfaces)      │  │
//!     │  │    - FlashDevice           │  │
//!     │  │    - QueueObserver         │  │
//!     │  └────────────────────────────┘  │
//!     └──────────────────────────────────┘
//!                    ▲
//!                    │ implemented by
//!                    │
//!     ┌──────────────────────────────────┐
//!     │      Adapter Layer               │
//!     │  - NorFlashDevice                │
//!     │  - RamFlash                      │
//!     └──────────────────────────────────┘
//! ```
//!
//! # On-flash layout
//!
//! ```text
//! reserved_offset
//! │
//! ▼
//! ┌──────────┬──────────┬──────────┬─────┬──────────────┐
//! │ map      │ data 1   │ data 2   │ ... │ data N-1     │
//! │ sector   │          │          │     │              │
//! └──────────┴──────────┴──────────┴─────┴──────────────┘
//!   byte 0    = 0x55 signature
//!   byte k    = status of data sector k
//!   byte >= N = unused
//! ```

pub mod entities;
pub mod error;
pub mod ports;
pub mod value_objects;

mod sector_queue;
mod status_table;

// Re-export commonly used types
pub use entities::{SIGNATURE, SectorStatus};
pub use error::QueueError;
pub use ports::{FlashDevice, QueueObserver};
pub use sector_queue::SectorQueue;
pub use status_table::{Allocation, StatusSummary, StatusTable};
pub use value_objects::{
    ConfigError, CorruptionPolicy, FlashGeometry, GeometryPolicy, KILOBYTE, QueueConfig,
    SECTOR_SIZE_4K, SectorIndex,
};
