//! Talos - NTFS boot sector recovery tool.
//!
//! Scans a damaged partition for surviving MFT records, derives the
//! volume geometry from where they sit, and rewrites the primary and
//! backup boot sectors after operator confirmation.

mod console;
mod dump;
mod lister;

use anyhow::{Context, Result};
use clap::Parser;
use humansize::{format_size, BINARY};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use talos_core::{
    rebuild_ntfs_boot, BlockDevice, CommandStream, CoreError, EventSource, Partition,
    RebuildOptions,
};
use talos_io::FileDevice;

#[derive(Parser, Debug)]
#[command(name = "talos")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Disk device or image file holding the damaged volume
    device: String,

    /// Byte offset of the partition on the device
    #[arg(long, default_value_t = 0)]
    offset: u64,

    /// Partition size in bytes (defaults to the rest of the device)
    #[arg(long)]
    size: Option<u64>,

    /// Logical sector size in bytes
    #[arg(long, default_value_t = 512)]
    sector_size: u32,

    /// Headless command stream, e.g. "dump,noconfirm,write"
    #[arg(long)]
    cmd: Option<String>,

    /// Confirm scan hits and offer parameter overrides
    #[arg(long, default_value_t = false)]
    expert: bool,

    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        })
        .with_target(false)
        .init();

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl+C handler")?;

    let dev = match FileDevice::open(&args.device) {
        Ok(dev) => dev,
        Err(_) => {
            let dev = FileDevice::open_read_only(&args.device)
                .with_context(|| format!("Failed to open device: {}", args.device))?;
            println!("Opened {} read-only; writes will fail.", args.device);
            dev
        }
    };
    let mut dev = dev.with_sector_size(args.sector_size);

    let partition = Partition {
        offset: args.offset,
        size: args.size.unwrap_or_else(|| dev.size().saturating_sub(args.offset)),
    };
    anyhow::ensure!(
        partition.size >= u64::from(args.sector_size) * 2,
        "partition is smaller than two sectors"
    );

    println!("{}", dev.description());
    println!(
        "Partition: offset {} B, size {}",
        partition.offset,
        format_size(partition.size, BINARY)
    );

    let interactive = args.cmd.is_none();
    let mut ui = console::ConsoleUi::new(running, interactive);
    let options = RebuildOptions {
        expert: args.expert,
    };
    let mut list = |dev: &mut dyn BlockDevice, part: &Partition| {
        lister::list_volume_preview(dev, part)
    };

    let mut events: Box<dyn EventSource + '_> = match &args.cmd {
        Some(cmd) => Box::new(CommandStream::new(cmd)),
        None => Box::new(console::InteractiveMenu),
    };
    let outcome = rebuild_ntfs_boot(
        &mut dev,
        &partition,
        &mut ui,
        &mut *events,
        &mut list,
        &options,
    );
    ui.finish();

    match outcome {
        Ok(result) => {
            tracing::debug!("rebuild finished: {result:?}");
            Ok(ExitCode::SUCCESS)
        }
        Err(CoreError::RootDirectory) => {
            eprintln!("{}", CoreError::RootDirectory);
            Ok(ExitCode::from(1))
        }
        Err(e) => Err(e).context("rebuild failed"),
    }
}
