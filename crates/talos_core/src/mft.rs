//! Read-side parsing of NTFS `FILE` records.
//!
//! Only the attributes the rebuild needs are understood: `$FILE_NAME`
//! (0x30) to recognize the `$MFT` record itself, `$DATA` (0x80) for the
//! starting LCN of the table, and `$INDEX_ROOT` (0x90) for the index block
//! size of the root directory. Everything is bounds-checked against the
//! buffer; a record that cannot be parsed simply yields `None` and the
//! caller skips it.

use crate::bits::{read_le16, read_le32};

pub const FILE_SIGNATURE: &[u8; 4] = b"FILE";

pub const ATTR_FILE_NAME: u32 = 0x30;
pub const ATTR_DATA: u32 = 0x80;
pub const ATTR_INDEX_ROOT: u32 = 0x90;
const ATTR_END: u32 = 0xFFFF_FFFF;

/// `flags` value of a live file record (in-use, not a directory).
pub const FLAG_IN_USE: u16 = 0x0001;

const HEADER_LEN: usize = 0x30;

/// A borrowed view over one MFT record buffer.
pub struct MftRecord<'a> {
    buf: &'a [u8],
}

impl<'a> MftRecord<'a> {
    pub fn new(buf: &'a [u8]) -> Option<Self> {
        if buf.len() < HEADER_LEN {
            return None;
        }
        Some(Self { buf })
    }

    pub fn has_file_signature(&self) -> bool {
        &self.buf[..4] == FILE_SIGNATURE
    }

    /// LE16 at 0x14: offset of the first attribute. A sane record has it
    /// 8-aligned and past the 42-byte fixed header.
    pub fn attrs_offset(&self) -> u16 {
        read_le16(self.buf, 0x14)
    }

    pub fn flags(&self) -> u16 {
        read_le16(self.buf, 0x16)
    }

    /// LE32 at 0x1C: allocated size of this record in bytes.
    pub fn bytes_per_record(&self) -> u32 {
        read_le32(self.buf, 0x1C)
    }

    /// The admission test used by the sector sweep: `FILE` signature plus
    /// a plausible attribute offset.
    pub fn is_plausible(&self) -> bool {
        let attrs = self.attrs_offset();
        self.has_file_signature() && attrs % 8 == 0 && attrs >= 42
    }

    fn attributes(&self) -> AttrIter<'a> {
        AttrIter {
            buf: self.buf,
            pos: usize::from(self.attrs_offset()),
        }
    }

    fn find_attr(&self, type_code: u32) -> Option<&'a [u8]> {
        self.attributes().find(|a| read_le32(a, 0) == type_code)
    }

    /// Resident value slice of an attribute, if the attribute is resident
    /// and its value lies within the record buffer.
    fn resident_value(attr: &'a [u8]) -> Option<&'a [u8]> {
        if attr.len() < 0x18 || attr[8] != 0 {
            return None;
        }
        let len = read_le32(attr, 0x10) as usize;
        let off = usize::from(read_le16(attr, 0x14));
        attr.get(off..off + len)
    }

    /// First `$FILE_NAME` of the record, decoded from UTF-16LE.
    pub fn file_name(&self) -> Option<String> {
        let value = Self::resident_value(self.find_attr(ATTR_FILE_NAME)?)?;
        if value.len() < 0x42 {
            return None;
        }
        let name_len = usize::from(value[0x40]);
        let name = value.get(0x42..0x42 + 2 * name_len)?;
        let units: Vec<u16> = name.chunks_exact(2).map(|c| read_le16(c, 0)).collect();
        String::from_utf16(&units).ok()
    }

    /// True iff the record's `$FILE_NAME` equals `name` exactly.
    pub fn file_name_matches(&self, name: &str) -> bool {
        self.file_name().as_deref() == Some(name)
    }

    /// Starting LCN of the record's non-resident `$DATA` attribute,
    /// decoded from the first entry of the mapping-pairs array.
    pub fn data_start_lcn(&self) -> Option<u64> {
        let attr = self.find_attr(ATTR_DATA)?;
        if attr.len() < 0x40 || attr[8] != 1 {
            return None;
        }
        let runs = attr.get(usize::from(read_le16(attr, 0x20))..)?;
        let header = *runs.first()?;
        let len_size = usize::from(header & 0x0F);
        let off_size = usize::from(header >> 4);
        if off_size == 0 || off_size > 8 {
            return None;
        }
        let lcn_bytes = runs.get(1 + len_size..1 + len_size + off_size)?;
        let mut lcn: i64 = 0;
        for (i, &b) in lcn_bytes.iter().enumerate() {
            lcn |= i64::from(b) << (8 * i);
        }
        // Sign-extend from the top byte of the field.
        let shift = 64 - 8 * off_size as u32;
        lcn = (lcn << shift) >> shift;
        u64::try_from(lcn).ok()
    }

    /// `bytes_per_index_record` of the record's `$INDEX_ROOT` attribute.
    pub fn index_block_size(&self) -> Option<u32> {
        let value = Self::resident_value(self.find_attr(ATTR_INDEX_ROOT)?)?;
        if value.len() < 12 {
            return None;
        }
        Some(read_le32(value, 8))
    }
}

struct AttrIter<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Iterator for AttrIter<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        if self.pos + 8 > self.buf.len() {
            return None;
        }
        let type_code = read_le32(self.buf, self.pos);
        if type_code == ATTR_END {
            return None;
        }
        let len = read_le32(self.buf, self.pos + 4) as usize;
        if len == 0 || len % 8 != 0 || self.pos + len > self.buf.len() {
            return None;
        }
        let attr = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Some(attr)
    }
}
