//! Orchestration of a full boot-sector rebuild.
//!
//! The flow is: sweep the partition for MFT records, correlate whatever
//! was collected, optionally let an expert override the derived numbers,
//! read the root directory for the index block size, compose the new
//! sector and hand it to the applier. The partition itself is never
//! modified; offset corrections are only reported.

use crate::apply::{apply_boot_sector, ApplyOutcome, DirLister, EventSource};
use crate::bootsec::{compose, Geometry, BOOT_SECTOR_SIZE};
use crate::device::{BlockDevice, Partition};
use crate::mft::MftRecord;
use crate::resolver::correlate_pairs;
use crate::scanner::scan_for_mft;
use crate::ui::RebuildUi;
use crate::{CoreError, Result};

pub const DEFAULT_MFT_RECORD_SIZE: u32 = 1024;
pub const DEFAULT_INDEX_BLOCK_SIZE: u32 = 4096;

/// Index of the root directory in the MFT.
const ROOT_DIR_RECORD: u64 = 5;

#[derive(Debug, Clone, Copy, Default)]
pub struct RebuildOptions {
    /// Ask before accepting a scan hit and offer parameter overrides.
    pub expert: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildOutcome {
    /// A boot sector was composed and written.
    Written,
    /// A boot sector was composed but the operator declined the write.
    NotWritten,
    /// No workable geometry was found.
    Unresolved,
}

/// Rebuilds the NTFS boot sector of `partition`.
///
/// The only fatal error is failing to read the MFT root directory after
/// the geometry has been resolved; everything else degrades to skipped
/// sectors, UI messages, or an `Unresolved` outcome.
pub fn rebuild_ntfs_boot(
    dev: &mut dyn BlockDevice,
    partition: &Partition,
    ui: &mut dyn RebuildUi,
    events: &mut dyn EventSource,
    lister: &mut DirLister,
    options: &RebuildOptions,
) -> Result<RebuildOutcome> {
    tracing::info!("rebuild ntfs boot sector on {}", dev.description());
    let sector_size = dev.sector_size();

    let scan = scan_for_mft(dev, partition, ui, options.expert);
    if scan.stopped {
        tracing::info!(
            "scan interrupted, continuing with {} observations",
            scan.observations.len()
        );
    }

    let hints = correlate_pairs(&scan.observations, partition, sector_size);
    if !hints.is_empty() {
        ui.message("Potential partition:");
        for hint in &hints {
            ui.message(&format!(
                "  offset {} bytes, {} sectors/cluster",
                hint.part_offset, hint.sectors_per_cluster
            ));
        }
    }

    let (mut spc, mut mft_lcn, mut mftmirr_lcn, mut mft_record_size) = match scan.resolved {
        Some(r) => (
            u64::from(r.sectors_per_cluster),
            r.mft_lcn,
            r.mftmirr_lcn,
            u64::from(r.mft_record_size),
        ),
        None => (0, 0, 0, u64::from(DEFAULT_MFT_RECORD_SIZE)),
    };

    if options.expert {
        spc = ui.ask_number("Sectors per cluster ", spc, 512);
        mft_lcn = ui.ask_number("MFT LCN ", mft_lcn, 0);
        mftmirr_lcn = ui.ask_number("MFTMIRR LCN ", mftmirr_lcn, 0);
        mft_record_size = ui.ask_number("MFT record size ", mft_record_size, 4096);
    }

    if spc == 0 || mft_record_size == 0 {
        tracing::error!("Failed to rebuild NTFS boot sector.");
        ui.message("Failed to rebuild NTFS boot sector.");
        return Ok(RebuildOutcome::Unresolved);
    }
    let spc = spc as u32;
    let mft_record_size = mft_record_size as u32;

    let index_block_size = read_index_block_size(
        dev,
        partition,
        mft_lcn,
        spc,
        mft_record_size,
        ui,
    )?;

    let geometry = Geometry {
        sectors_per_cluster: spc,
        mft_lcn,
        mftmirr_lcn,
        mft_record_size,
        index_block_size,
    };
    tracing::info!("sectors_per_cluster {spc}");
    tracing::info!("mft_lcn             {mft_lcn}");
    tracing::info!("mftmirr_lcn         {mftmirr_lcn}");
    tracing::info!("mft_record_size     {mft_record_size}");
    tracing::info!("index_block_size    {index_block_size}");

    create_and_apply(dev, partition, &geometry, ui, events, lister)
}

/// Reads MFT record 5 (the root directory) for `bytes_per_index_record`,
/// falling back to 4 KiB when the field is missing or not a positive
/// multiple of the sector size. An unreadable record here is fatal: the
/// geometry points somewhere that is not an MFT.
fn read_index_block_size(
    dev: &mut dyn BlockDevice,
    partition: &Partition,
    mft_lcn: u64,
    spc: u32,
    mft_record_size: u32,
    ui: &mut dyn RebuildUi,
) -> Result<u32> {
    let sector_size = u64::from(dev.sector_size());
    let offset = partition.offset
        + mft_lcn * u64::from(spc) * sector_size
        + ROOT_DIR_RECORD * u64::from(mft_record_size);
    let mut buffer = vec![0u8; mft_record_size as usize];
    if dev.read_at(offset, &mut buffer).is_err() {
        ui.message("NTFS Can't read \"root directory\" in MFT");
        return Err(CoreError::RootDirectory);
    }
    let size = MftRecord::new(&buffer)
        .and_then(|r| r.index_block_size())
        .unwrap_or(0);
    if size == 0 || size % dev.sector_size() != 0 {
        return Ok(DEFAULT_INDEX_BLOCK_SIZE);
    }
    Ok(size)
}

fn create_and_apply(
    dev: &mut dyn BlockDevice,
    partition: &Partition,
    geometry: &Geometry,
    ui: &mut dyn RebuildUi,
    events: &mut dyn EventSource,
    lister: &mut DirLister,
) -> Result<RebuildOutcome> {
    let mut orgboot = [0u8; BOOT_SECTOR_SIZE];
    if dev.read_at(partition.offset, &mut orgboot).is_err() {
        tracing::error!("can't read current boot sector, assuming zeros");
        orgboot = [0u8; BOOT_SECTOR_SIZE];
    }

    let newboot = compose(geometry, dev.sector_size(), dev.geometry(), partition, &orgboot);

    match apply_boot_sector(dev, partition, &newboot, &orgboot, events, ui, lister) {
        ApplyOutcome::Written => Ok(RebuildOutcome::Written),
        ApplyOutcome::Skipped => Ok(RebuildOutcome::NotWritten),
    }
}
