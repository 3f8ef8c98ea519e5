//! Flash image files.
//!
//! An image is a raw dump of the whole chip. It is loaded into a `RamFlash`,
//! so NOR rules (erase before setting bits, erase whole sectors) still apply
//! to everything the queue does, and written back in one piece afterwards.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result, bail};
use flashq::{NorFlashDevice, RamFlash, SECTOR_SIZE_4K, SectorQueue};

/// Sector size of every image the tool handles.
pub const SECTOR_SIZE: usize = SECTOR_SIZE_4K as usize;

pub type Flash = RamFlash<SECTOR_SIZE>;

pub type Queue = SectorQueue<NorFlashDevice<Flash>, SECTOR_SIZE>;

/// Create an erased image of `size` bytes.
pub fn create(path: &Path, size: u64, force: bool) -> Result<()> {
    if size == 0 || size % SECTOR_SIZE as u64 != 0 {
        bail!("image size {size} is not a positive multiple of {SECTOR_SIZE} bytes");
    }
    let len = usize::try_from(size).context("image size does not fit in memory")?;

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .create_new(!force)
        .open(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(&vec![0xFF; len])
        .with_context(|| format!("Failed to write {}", path.display()))?;

    log::info!("created {} ({} sectors)", path.display(), len / SECTOR_SIZE);
    Ok(())
}

/// Load an image into memory.
pub fn load(path: &Path) -> Result<Flash> {
    let data = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    if data.is_empty() || data.len() % SECTOR_SIZE != 0 {
        bail!(
            "{} is {} bytes, not a whole number of {SECTOR_SIZE}-byte sectors",
            path.display(),
            data.len()
        );
    }
    Ok(RamFlash::from_image(data))
}

/// Write an image back to disk.
pub fn store(path: &Path, flash: Flash) -> Result<()> {
    let erases: u32 = flash.erase_counts().iter().sum();
    fs::write(path, flash.into_image())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    log::debug!("stored {} after {} sector erases", path.display(), erases);
    Ok(())
}
