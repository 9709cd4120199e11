//! File-backed implementation of the `BlockDevice` port.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use talos_core::{BlockDevice, Chs, CoreError, Result};

const DEFAULT_SECTOR_SIZE: u32 = 512;

/// A disk, partition device, or disk image opened through `std::fs`.
///
/// Opening read-write is preferred so a confirmed rebuild can be
/// applied; `open_read_only` exists for inspection runs and for callers
/// without write permission.
pub struct FileDevice {
    file: File,
    path: PathBuf,
    size: u64,
    sector_size: u32,
    writable: bool,
}

impl FileDevice {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, true)
    }

    pub fn open_read_only(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, false)
    }

    fn open_with(path: impl AsRef<Path>, writable: bool) -> Result<Self> {
        let path = path.as_ref();
        let mut file = OpenOptions::new()
            .read(true)
            .write(writable)
            .open(path)?;

        #[cfg(target_os = "linux")]
        {
            use rustix::fs::{fadvise, Advice};
            let _ = fadvise(&file, 0, None, Advice::Sequential);
        }

        let size = file.seek(SeekFrom::End(0))?;
        file.seek(SeekFrom::Start(0))?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
            size,
            sector_size: DEFAULT_SECTOR_SIZE,
            writable,
        })
    }

    pub fn with_sector_size(mut self, sector_size: u32) -> Self {
        self.sector_size = sector_size;
        self
    }

    /// Total size in bytes, as reported by seeking to the end.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }
}

impl BlockDevice for FileDevice {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        if offset.checked_add(buf.len() as u64).is_none_or(|end| end > self.size) {
            return Err(CoreError::OutOfBounds {
                offset,
                size: self.size,
            });
        }
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(buf)?;
        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    fn sector_size(&self) -> u32 {
        self.sector_size
    }

    fn geometry(&self) -> Chs {
        // LBA-era fiction: 255 heads, 63 sectors per track. `heads` is
        // the maximum head index.
        let sectors = 63;
        let heads = 254;
        let track_bytes = u64::from(self.sector_size) * 255 * 63;
        Chs {
            cylinders: (self.size / track_bytes.max(1)) as u32,
            heads,
            sectors,
        }
    }

    fn description(&self) -> String {
        format!("Disk {} - {} B", self.path.display(), self.size)
    }
}
