//! # Talos Core
//!
//! Core engine for rebuilding the boot sector of an NTFS volume whose
//! first sector is missing, zeroed, or corrupt.
//!
//! The engine sweeps the partition's data area for surviving Master File
//! Table records, infers the volume geometry (cluster size, MFT and
//! mirror locations, record sizes) from where those records physically
//! sit, composes a bit-compatible 512-byte boot sector, and drives an
//! operator-confirmed rewrite of the primary and backup copies.
//!
//! ## Key Components
//!
//! - **`BlockDevice`**: the port through which all disk access flows
//! - **`scanner`**: the two-phase sector sweep
//! - **`resolver`**: integer number theory turning record sightings into
//!   a cluster size
//! - **`bootsec`**: composing and reading the on-disk layout
//! - **`apply`**: the diff/confirm/write state machine
//! - **`rebuild_ntfs_boot`**: the orchestrator tying it together

pub mod apply;
pub mod bits;
pub mod bootsec;
pub mod device;
mod error;
pub mod mft;
pub mod rebuild;
pub mod resolver;
pub mod scanner;
pub mod ui;

#[cfg(test)]
pub(crate) mod testutil;

pub use apply::{ApplyEvent, ApplyOutcome, CommandStream, DirLister, EventSource};
pub use bootsec::{compose, BootSector, Geometry, BOOT_SECTOR_SIZE};
pub use device::{BlockDevice, Chs, MemDevice, OverlayDevice, Partition};
pub use error::{CoreError, Result};
pub use rebuild::{rebuild_ntfs_boot, RebuildOptions, RebuildOutcome};
pub use resolver::{MftObservation, PartitionHint};
pub use ui::{RebuildUi, SilentUi};
