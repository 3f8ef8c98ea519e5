//! Command-line interface definition and command dispatch

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use aligned::{A4, Aligned};
use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use flashq::{
    CorruptionPolicy, GeometryPolicy, NorFlashDevice, QueueConfig, SectorIndex, SectorQueue,
    SectorStatus,
};

use crate::image::{self, Queue, SECTOR_SIZE};

type Sector = Aligned<A4, [u8; SECTOR_SIZE]>;

/// Bytes shown when a popped sector is printed instead of saved.
const PREVIEW_LEN: usize = 64;

#[derive(Parser)]
#[command(name = "flashq")]
#[command(about = "Drive a wear-leveling sector queue stored in a NOR flash image", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub options: QueueOptions,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command that opens a queue.
#[derive(Args, Debug, Clone, Copy)]
pub struct QueueOptions {
    /// Bytes at the start of the image that belong to something else
    #[arg(long, global = true, default_value = "0", value_parser = parse_size)]
    pub reserved_offset: u64,

    /// Fail when the image size differs from the configured layout
    #[arg(long, global = true)]
    pub strict_geometry: bool,

    /// Treat unrecognized status bytes as reclaimable instead of failing
    #[arg(long, global = true)]
    pub reclaim_corrupted: bool,

    /// Run the command without writing the image back
    #[arg(long, global = true)]
    pub dry_run: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create an erased flash image
    Create {
        /// Path of the image to create
        image: PathBuf,

        /// Image size in bytes (K and M suffixes accepted)
        #[arg(long, short, value_parser = parse_size)]
        size: u64,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Show queue occupancy and the status table
    Status {
        image: PathBuf,

        /// Also list the status of every non-empty data sector
        #[arg(long, short)]
        verbose: bool,
    },
    /// Push the contents of a file as one sector
    Push {
        image: PathBuf,

        /// File to store (at most one sector, zero padded)
        input: PathBuf,
    },
    /// Pop the next sector
    Pop {
        image: PathBuf,

        /// Write the sector here instead of printing a hex preview
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
    /// Show the next sector without consuming it
    Peek {
        image: PathBuf,

        /// Write the sector here instead of printing a hex preview
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
    /// Discard every queued sector
    Format { image: PathBuf },
}

/// Parse a byte count such as `4096`, `64K` or `8M`.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let (digits, multiplier) = match s.char_indices().last() {
        Some((i, 'K' | 'k')) => (&s[..i], 1024),
        Some((i, 'M' | 'm')) => (&s[..i], 1024 * 1024),
        _ => (s, 1),
    };
    let value: u64 = digits
        .parse()
        .map_err(|_| format!("invalid size '{s}'"))?;
    value
        .checked_mul(multiplier)
        .ok_or_else(|| format!("size '{s}' is too large"))
}

impl QueueOptions {
    /// Layout for an image of `image_len` bytes.
    pub fn config(&self, image_len: usize) -> Result<QueueConfig> {
        let total = u32::try_from(image_len).context("image larger than 4 GiB")?;
        let reserved =
            u32::try_from(self.reserved_offset).context("reserved offset larger than 4 GiB")?;

        let mut config = QueueConfig::new(total, reserved, SECTOR_SIZE as u32)
            .context("Invalid queue layout")?;
        if self.strict_geometry {
            config = config.with_geometry_policy(GeometryPolicy::Strict);
        }
        if self.reclaim_corrupted {
            config = config.with_corruption_policy(CorruptionPolicy::Reclaim);
        }
        Ok(config)
    }
}

/// Load an image, run `op` on an initialized queue over it and store the
/// result unless this is a dry run.
fn with_queue<T>(
    path: &Path,
    options: &QueueOptions,
    op: impl FnOnce(&mut Queue) -> Result<T>,
) -> Result<T> {
    let flash = image::load(path)?;
    let config = options.config(flash.as_bytes().len())?;
    let mut queue =
        SectorQueue::new(NorFlashDevice::new(flash), config).context("Invalid queue layout")?;

    queue
        .initialize()
        .with_context(|| format!("Failed to open queue in {}", path.display()))?;
    let result = op(&mut queue);

    // Whatever reached the flash before a failure stays there
    if options.dry_run {
        log::info!("dry run, {} left unchanged", path.display());
    } else {
        image::store(path, queue.into_inner().into_inner())?;
    }
    result
}

pub fn run(cli: Cli) -> Result<()> {
    let options = cli.options;

    match cli.command {
        Commands::Create { image, size, force } => {
            image::create(&image, size, force)?;
            println!("Created {} ({} bytes)", image.display(), size);
            Ok(())
        }
        Commands::Status { image, verbose } => {
            with_queue(&image, &options, |queue| print_status(queue, verbose))
        }
        Commands::Push { image, input } => {
            let sector = read_payload(&input)?;
            let index = with_queue(&image, &options, |queue| {
                queue.push(&sector).context("Push failed")
            })?;
            println!("Pushed {} to {}", input.display(), index);
            Ok(())
        }
        Commands::Pop { image, out } => {
            let mut sector: Sector = Aligned([0; SECTOR_SIZE]);
            let index = with_queue(&image, &options, |queue| {
                queue.pop(&mut sector).context("Pop failed")
            })?;
            emit_payload(index, &sector, out.as_deref())
        }
        Commands::Peek { image, out } => {
            let mut sector: Sector = Aligned([0; SECTOR_SIZE]);
            let index = with_queue(&image, &options, |queue| {
                queue.peek(&mut sector).context("Peek failed")
            })?;
            emit_payload(index, &sector, out.as_deref())
        }
        Commands::Format { image } => {
            with_queue(&image, &options, |queue| {
                queue.format().context("Format failed")
            })?;
            println!("Formatted {}", image.display());
            Ok(())
        }
    }
}

fn print_status(queue: &Queue, verbose: bool) -> Result<()> {
    let config = queue.config();
    let summary = queue.summary();

    println!(
        "Region:     {} sectors of {} bytes at offset {:#x}",
        config.sector_count(),
        config.sector_size(),
        config.reserved_offset()
    );
    println!("Capacity:   {}", queue.capacity());
    println!("Unread:     {}", summary.unread);
    println!("Read:       {}", summary.read);
    println!("Empty:      {}", summary.empty);
    if summary.corrupted > 0 {
        println!("Corrupted:  {}", summary.corrupted);
    }
    println!("Free:       {}", queue.free_sectors());

    if verbose {
        for index in 1..config.sector_count() {
            let index = SectorIndex::new(index);
            match queue.status_of(index) {
                Some(SectorStatus::Empty) | None => {}
                Some(status) => println!("  {:>6}  {}", index.value(), status),
            }
        }
    }
    Ok(())
}

/// Read a file into a zero padded sector buffer.
fn read_payload(path: &Path) -> Result<Sector> {
    let data = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    if data.len() > SECTOR_SIZE {
        bail!(
            "{} is {} bytes, larger than one {SECTOR_SIZE}-byte sector",
            path.display(),
            data.len()
        );
    }

    let mut sector: Sector = Aligned([0; SECTOR_SIZE]);
    sector[..data.len()].copy_from_slice(&data);
    Ok(sector)
}

fn emit_payload(index: SectorIndex, sector: &Sector, out: Option<&Path>) -> Result<()> {
    match out {
        Some(path) => {
            fs::write(path, &sector[..])
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote {} to {}", index, path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}:", index)?;
            write_hex_preview(&mut stdout, &sector[..PREVIEW_LEN])?;
        }
    }
    Ok(())
}

fn write_hex_preview(w: &mut impl Write, bytes: &[u8]) -> io::Result<()> {
    for (row, chunk) in bytes.chunks(16).enumerate() {
        write!(w, "{:08x} ", row * 16)?;
        for byte in chunk {
            write!(w, " {:02x}", byte)?;
        }
        writeln!(w)?;
    }
    Ok(())
}
