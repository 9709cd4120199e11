//! Ports for raw device access.
//!
//! `BlockDevice` abstracts the storage medium so the same rebuild logic
//! works on physical disks, partition devices or image files. The engine
//! holds a non-owning `&mut dyn BlockDevice` for the duration of one
//! rebuild and assumes nothing about exclusive access beyond that.

use crate::error::Result;

/// Disk geometry as reported by the device.
///
/// `heads` is the maximum head index; the boot-sector composer stores
/// `heads + 1` on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chs {
    pub cylinders: u32,
    pub heads: u32,
    pub sectors: u32,
}

/// A partition region, in bytes from the start of the disk.
///
/// The engine reads both fields and may *report* a corrected offset, but
/// never mutates a partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    pub offset: u64,
    pub size: u64,
}

impl Partition {
    /// Partition size in sectors.
    pub fn total_sectors(&self, sector_size: u32) -> u64 {
        self.size / u64::from(sector_size)
    }

    /// Byte offset of the backup boot sector (last sector of the partition).
    pub fn backup_boot_offset(&self, sector_size: u32) -> u64 {
        self.offset + self.size - u64::from(sector_size)
    }
}

/// A raw block device or disk image.
pub trait BlockDevice {
    /// Reads exactly `buf.len()` bytes at the given byte offset.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()>;

    /// Writes `buf` at the given byte offset.
    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<()>;

    /// Flushes pending writes to the medium.
    fn sync(&mut self) -> Result<()>;

    /// Logical sector size in bytes.
    fn sector_size(&self) -> u32;

    fn geometry(&self) -> Chs;

    /// Human-readable description shown in banners and logs.
    fn description(&self) -> String;
}

/// A scoped read overlay over another device.
///
/// Reads intersecting `[start, start + data.len())` are served from `data`
/// after the underlying read; writes and sync pass through untouched. This
/// is how a directory listing can be previewed against a boot sector that
/// exists only in memory: wrap the device, run the lister, and the overlay
/// disappears when the wrapper goes out of scope.
pub struct OverlayDevice<'a> {
    inner: &'a mut dyn BlockDevice,
    start: u64,
    data: &'a [u8],
}

impl<'a> OverlayDevice<'a> {
    pub fn new(inner: &'a mut dyn BlockDevice, start: u64, data: &'a [u8]) -> Self {
        Self { inner, start, data }
    }
}

impl BlockDevice for OverlayDevice<'_> {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.inner.read_at(offset, buf)?;
        let end = offset + buf.len() as u64;
        let ov_end = self.start + self.data.len() as u64;
        let lo = offset.max(self.start);
        let hi = end.min(ov_end);
        if lo < hi {
            let dst = (lo - offset) as usize..(hi - offset) as usize;
            let src = (lo - self.start) as usize..(hi - self.start) as usize;
            buf[dst].copy_from_slice(&self.data[src]);
        }
        Ok(())
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<()> {
        self.inner.write_at(offset, buf)
    }

    fn sync(&mut self) -> Result<()> {
        self.inner.sync()
    }

    fn sector_size(&self) -> u32 {
        self.inner.sector_size()
    }

    fn geometry(&self) -> Chs {
        self.inner.geometry()
    }

    fn description(&self) -> String {
        self.inner.description()
    }
}

/// A RAM-backed device over an owned byte buffer.
///
/// Useful for rehearsing a rebuild against an in-memory copy of a
/// partition, and as the device double in tests.
pub struct MemDevice {
    data: Vec<u8>,
    sector_size: u32,
    geometry: Chs,
}

impl MemDevice {
    pub fn new(data: Vec<u8>, sector_size: u32) -> Self {
        Self {
            data,
            sector_size,
            geometry: Chs {
                cylinders: 0,
                heads: 254,
                sectors: 63,
            },
        }
    }

    pub fn with_geometry(mut self, geometry: Chs) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl BlockDevice for MemDevice {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let start = offset as usize;
        let end = start.checked_add(buf.len()).filter(|&e| e <= self.data.len());
        match end {
            Some(end) => {
                buf.copy_from_slice(&self.data[start..end]);
                Ok(())
            }
            None => Err(crate::CoreError::OutOfBounds {
                offset,
                size: self.data.len() as u64,
            }),
        }
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<()> {
        let start = offset as usize;
        let end = start.checked_add(buf.len()).filter(|&e| e <= self.data.len());
        match end {
            Some(end) => {
                self.data[start..end].copy_from_slice(buf);
                Ok(())
            }
            None => Err(crate::CoreError::OutOfBounds {
                offset,
                size: self.data.len() as u64,
            }),
        }
    }

    fn sync(&mut self) -> Result<()> {
        Ok(())
    }

    fn sector_size(&self) -> u32 {
        self.sector_size
    }

    fn geometry(&self) -> Chs {
        self.geometry
    }

    fn description(&self) -> String {
        format!("Memory image - {} B", self.data.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_backup_offset() {
        let p = Partition {
            offset: 1024 * 1024,
            size: 1024 * 1024 * 1024,
        };
        assert_eq!(p.backup_boot_offset(512), 1024 * 1024 + 1024 * 1024 * 1024 - 512);
        assert_eq!(p.total_sectors(512), 2 * 1024 * 1024);
    }

    #[test]
    fn mem_device_round_trip() {
        let mut dev = MemDevice::new(vec![0u8; 4096], 512);
        dev.write_at(512, b"hello").unwrap();
        let mut buf = [0u8; 5];
        dev.read_at(512, &mut buf).unwrap();
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn mem_device_read_past_end() {
        let mut dev = MemDevice::new(vec![0u8; 1024], 512);
        let mut buf = [0u8; 512];
        assert!(dev.read_at(1024, &mut buf).is_err());
        assert!(dev.read_at(768, &mut buf).is_err());
    }

    #[test]
    fn overlay_patches_exact_range() {
        let mut dev = MemDevice::new(vec![0xAAu8; 2048], 512);
        let patch = vec![0x11u8; 512];
        let mut overlay = OverlayDevice::new(&mut dev, 512, &patch);

        let mut buf = [0u8; 512];
        overlay.read_at(512, &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 0x11));

        overlay.read_at(0, &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 0xAA));
    }

    #[test]
    fn overlay_patches_partial_intersection() {
        let mut dev = MemDevice::new(vec![0xAAu8; 2048], 512);
        let patch = vec![0x11u8; 512];
        let mut overlay = OverlayDevice::new(&mut dev, 512, &patch);

        let mut buf = [0u8; 1024];
        overlay.read_at(256, &mut buf).unwrap();
        assert!(buf[..256].iter().all(|&b| b == 0xAA));
        assert!(buf[256..768].iter().all(|&b| b == 0x11));
        assert!(buf[768..].iter().all(|&b| b == 0xAA));
    }

    #[test]
    fn overlay_writes_pass_through() {
        let mut dev = MemDevice::new(vec![0u8; 2048], 512);
        let patch = vec![0x11u8; 512];
        {
            let mut overlay = OverlayDevice::new(&mut dev, 0, &patch);
            overlay.write_at(0, &[0x22u8; 512]).unwrap();
        }
        // The overlay shadows reads only; the underlying bytes took the write.
        assert!(dev.data()[..512].iter().all(|&b| b == 0x22));
    }
}
