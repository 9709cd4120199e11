//! Builders for the synthetic MFT records used across the unit tests.

use crate::bits::{write_le16, write_le32, write_le64};

pub struct RecordSpec {
    pub name: &'static str,
    pub data_lcn: Option<u64>,
    pub index_block_size: Option<u32>,
    pub flags: u16,
    pub bytes_per_record: u32,
}

impl RecordSpec {
    pub fn mft(data_lcn: u64) -> Self {
        Self {
            name: "$MFT",
            data_lcn: Some(data_lcn),
            index_block_size: None,
            flags: 0x0001,
            bytes_per_record: 1024,
        }
    }

    pub fn mftmirr(data_lcn: u64) -> Self {
        Self {
            name: "$MFTMirr",
            ..Self::mft(data_lcn)
        }
    }

    pub fn root_dir(index_block_size: u32) -> Self {
        Self {
            name: ".",
            data_lcn: None,
            index_block_size: Some(index_block_size),
            flags: 0x0003,
            bytes_per_record: 1024,
        }
    }
}

/// Serializes a 1024-byte `FILE` record holding a `$FILE_NAME` attribute
/// and, when the spec asks for them, a non-resident `$DATA` run and/or an
/// `$INDEX_ROOT`.
pub fn raw_record(spec: &RecordSpec) -> Vec<u8> {
    let mut rec = vec![0u8; 1024];
    rec[..4].copy_from_slice(b"FILE");
    write_le16(&mut rec, 0x04, 0x30); // update sequence offset
    write_le16(&mut rec, 0x10, 1); // sequence number
    write_le16(&mut rec, 0x14, 0x38); // first attribute
    write_le16(&mut rec, 0x16, spec.flags);
    write_le32(&mut rec, 0x18, 0x38); // bytes in use, patched below
    write_le32(&mut rec, 0x1C, spec.bytes_per_record);

    let mut pos = 0x38;
    pos = put_file_name(&mut rec, pos, spec.name);
    if let Some(lcn) = spec.data_lcn {
        pos = put_data_run(&mut rec, pos, lcn);
    }
    if let Some(block) = spec.index_block_size {
        pos = put_index_root(&mut rec, pos, block);
    }
    write_le32(&mut rec, pos, 0xFFFF_FFFF);
    write_le32(&mut rec, 0x18, (pos + 8) as u32);
    rec
}

fn put_file_name(rec: &mut [u8], pos: usize, name: &str) -> usize {
    let value_len = 0x42 + 2 * name.len();
    let attr_len = round8(0x18 + value_len);
    write_le32(rec, pos, 0x30);
    write_le32(rec, pos + 0x04, attr_len as u32);
    // resident, unnamed
    write_le32(rec, pos + 0x10, value_len as u32);
    write_le16(rec, pos + 0x14, 0x18);
    let value = pos + 0x18;
    rec[value + 0x40] = name.len() as u8;
    rec[value + 0x41] = 3; // Win32+DOS namespace
    for (i, unit) in name.encode_utf16().enumerate() {
        write_le16(rec, value + 0x42 + 2 * i, unit);
    }
    pos + attr_len
}

fn put_data_run(rec: &mut [u8], pos: usize, lcn: u64) -> usize {
    let lcn_bytes = encode_lcn(lcn);
    let attr_len = round8(0x40 + 2 + lcn_bytes.len() + 1);
    write_le32(rec, pos, 0x80);
    write_le32(rec, pos + 0x04, attr_len as u32);
    rec[pos + 0x08] = 1; // non-resident
    write_le64(rec, pos + 0x18, 15); // last VCN
    write_le16(rec, pos + 0x20, 0x40); // mapping pairs offset
    write_le64(rec, pos + 0x28, 16 * 1024);
    write_le64(rec, pos + 0x30, 16 * 1024);
    write_le64(rec, pos + 0x38, 16 * 1024);
    let run = pos + 0x40;
    rec[run] = ((lcn_bytes.len() as u8) << 4) | 1;
    rec[run + 1] = 16; // run length in clusters
    rec[run + 2..run + 2 + lcn_bytes.len()].copy_from_slice(&lcn_bytes);
    pos + attr_len
}

fn put_index_root(rec: &mut [u8], pos: usize, block_size: u32) -> usize {
    let value_len = 0x20;
    let attr_len = round8(0x18 + value_len);
    write_le32(rec, pos, 0x90);
    write_le32(rec, pos + 0x04, attr_len as u32);
    write_le32(rec, pos + 0x10, value_len as u32);
    write_le16(rec, pos + 0x14, 0x18);
    let value = pos + 0x18;
    write_le32(rec, value, 0x30); // indexed attribute type
    write_le32(rec, value + 0x08, block_size);
    rec[value + 0x0C] = 1; // clusters per index block
    pos + attr_len
}

/// Smallest little-endian signed encoding of a non-negative LCN delta.
fn encode_lcn(lcn: u64) -> Vec<u8> {
    let bytes = lcn.to_le_bytes();
    let mut n = 8;
    while n > 1 && bytes[n - 1] == 0 && bytes[n - 2] < 0x80 {
        n -= 1;
    }
    bytes[..n].to_vec()
}

fn round8(n: usize) -> usize {
    (n + 7) & !7
}
