//! I/O infrastructure adapters for the talos recovery tool.
//!
//! `FileDevice` implements the core's `BlockDevice` port over anything
//! file-like: physical disks (`/dev/sda`), partition devices, or raw
//! image files.

mod file_device;

pub use file_device::FileDevice;
