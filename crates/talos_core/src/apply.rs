//! Deciding whether the composed boot sector goes to disk.
//!
//! The decision logic is a small state machine over `ApplyEvent`s, fed
//! either by the interactive menu in the application or by a scripted
//! `CommandStream`. Both adapters share one code path, so the scripted
//! and interactive flavors cannot drift apart.

use crate::bootsec::{log_boot_info2, BOOT_SECTOR_SIZE};
use crate::device::{BlockDevice, OverlayDevice, Partition};
use crate::ui::RebuildUi;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyEvent {
    Dump,
    List,
    Write,
    Quit,
    /// Makes the next `Write` skip its confirmation; sticky for the rest
    /// of the session.
    NoConfirm,
}

/// Where the next decision comes from.
pub trait EventSource {
    fn next_event(&mut self) -> ApplyEvent;
}

/// Scripted adapter over a comma-separated verb list (`list`, `dump`,
/// `noconfirm`, `write`). Empty tokens are skipped; anything unrecognized
/// quits without writing.
pub struct CommandStream<'a> {
    tokens: std::str::Split<'a, char>,
}

impl<'a> CommandStream<'a> {
    pub fn new(commands: &'a str) -> Self {
        Self {
            tokens: commands.split(','),
        }
    }
}

impl EventSource for CommandStream<'_> {
    fn next_event(&mut self) -> ApplyEvent {
        for token in self.tokens.by_ref() {
            return match token.trim() {
                "" => continue,
                "list" => ApplyEvent::List,
                "dump" => ApplyEvent::Dump,
                "noconfirm" => ApplyEvent::NoConfirm,
                "write" => ApplyEvent::Write,
                other => {
                    tracing::info!("unknown apply command {other:?}");
                    ApplyEvent::Quit
                }
            };
        }
        ApplyEvent::Quit
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The write was issued (individual sector failures are reported to
    /// the UI but do not rescind this).
    Written,
    Skipped,
}

/// A directory lister invoked under the read overlay, so it sees the
/// composed boot sector instead of the on-disk one.
pub type DirLister<'a> = dyn FnMut(&mut dyn BlockDevice, &Partition) -> Result<()> + 'a;

/// Runs the diff-and-confirm loop until the operator writes or quits.
pub fn apply_boot_sector(
    dev: &mut dyn BlockDevice,
    partition: &Partition,
    newboot: &[u8; BOOT_SECTOR_SIZE],
    orgboot: &[u8; BOOT_SECTOR_SIZE],
    events: &mut dyn EventSource,
    ui: &mut dyn RebuildUi,
    lister: &mut DirLister,
) -> ApplyOutcome {
    let identical = newboot == orgboot;
    if identical {
        ui.message("Extrapolated boot sector and current boot sector are identical.");
    } else {
        log_boot_info2(newboot, orgboot);
        ui.message("Extrapolated boot sector and current boot sector are different.");
        ui.show_diff(newboot, orgboot);
    }

    let mut no_confirm = false;
    loop {
        match events.next_event() {
            ApplyEvent::Dump => ui.show_dump(newboot, orgboot),
            ApplyEvent::List => {
                let mut overlay = OverlayDevice::new(&mut *dev, partition.offset, newboot);
                if let Err(e) = lister(&mut overlay, partition) {
                    ui.message(&format!("Directory listing failed: {e}"));
                }
            }
            ApplyEvent::NoConfirm => no_confirm = true,
            ApplyEvent::Write => {
                if no_confirm || ui.confirm("Write new NTFS boot sector, confirm ? (Y/N)") {
                    write_boot_sectors(dev, partition, newboot, ui);
                    return ApplyOutcome::Written;
                }
                return ApplyOutcome::Skipped;
            }
            ApplyEvent::Quit => {
                tracing::info!("Don't write new NTFS boot sector and backup boot sector!");
                return ApplyOutcome::Skipped;
            }
        }
    }
}

/// Primary first, then the backup in the partition's last sector, then
/// sync. A failed write is reported but never aborts its sibling.
fn write_boot_sectors(
    dev: &mut dyn BlockDevice,
    partition: &Partition,
    newboot: &[u8; BOOT_SECTOR_SIZE],
    ui: &mut dyn RebuildUi,
) {
    tracing::info!("Write new boot!");
    if dev.write_at(partition.offset, newboot).is_err() {
        ui.message("Write error: Can't write new NTFS boot sector");
    }
    let backup = partition.backup_boot_offset(dev.sector_size());
    if dev.write_at(backup, newboot).is_err() {
        ui.message("Write error: Can't write new NTFS backup boot sector");
    }
    if let Err(e) = dev.sync() {
        tracing::warn!("sync failed after boot sector write: {e}");
    }
}
