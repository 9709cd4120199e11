//! Directory preview against a (possibly speculative) boot sector.
//!
//! All reads go through the `BlockDevice` handed in, so when the applier
//! runs this under its overlay the preview reflects the boot sector
//! being proposed, not the one on disk. If the proposed geometry is
//! wrong, the listing comes out empty or garbled - which is exactly the
//! signal the operator wants before confirming a write.

use talos_core::mft::{MftRecord, FLAG_IN_USE};
use talos_core::{BlockDevice, BootSector, Partition, Result};

const PREVIEW_RECORDS: u64 = 64;

/// Walks the first MFT records and prints the in-use file names.
pub fn list_volume_preview(dev: &mut dyn BlockDevice, partition: &Partition) -> Result<()> {
    match collect_preview(dev, partition)? {
        None => println!("Boot sector does not describe a usable NTFS volume"),
        Some(entries) => {
            println!("Volume preview (first {PREVIEW_RECORDS} MFT records):");
            for (index, name) in entries {
                println!("  {index:>5}  {name}");
            }
        }
    }
    Ok(())
}

/// The names behind `list_volume_preview`; `None` when the boot sector
/// itself is unusable.
pub fn collect_preview(
    dev: &mut dyn BlockDevice,
    partition: &Partition,
) -> Result<Option<Vec<(u64, String)>>> {
    let mut boot = [0u8; 512];
    dev.read_at(partition.offset, &mut boot)?;
    let bs = BootSector::new(&boot);
    let record_size = bs.mft_record_bytes();
    if bs.boot_signature() != 0xAA55 || bs.sectors_per_cluster() == 0 || record_size == 0 {
        return Ok(None);
    }

    let mft_offset = partition.offset + bs.mft_lcn() * u64::from(bs.cluster_bytes());
    let mut buf = vec![0u8; record_size as usize];
    let mut entries = Vec::new();
    for index in 0..PREVIEW_RECORDS {
        if dev.read_at(mft_offset + index * record_size, &mut buf).is_err() {
            break;
        }
        let Some(rec) = MftRecord::new(&buf) else {
            break;
        };
        if !rec.is_plausible() || rec.flags() & FLAG_IN_USE == 0 {
            continue;
        }
        if let Some(name) = rec.file_name() {
            entries.push((index, name));
        }
    }
    Ok(Some(entries))
}
