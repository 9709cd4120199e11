//! Two-phase sector sweep locating surviving MFT records.
//!
//! Phase A covers a narrow window around the middle of the partition,
//! where `$MFTMirr` usually sits on a healthy volume; phase B is the full
//! sweep from sector 1. A record is admitted when it carries the `FILE`
//! signature, a sane attribute offset, and a `$FILE_NAME` equal to `$MFT`.

use crate::bits::read_le32;
use crate::device::{BlockDevice, Partition};
use crate::mft::{MftRecord, FLAG_IN_USE};
use crate::resolver::{spc_by_division, MftObservation, MAX_OBSERVATIONS};
use crate::ui::RebuildUi;

/// Sectors either side of the partition midpoint swept in phase A.
const MIRROR_WINDOW: u64 = 20;

/// Progress/stop polling interval, in sectors.
const PROGRESS_MASK: u64 = 0xFFFF;

const SECTOR: usize = 512;
const CANDIDATE_READ: usize = 2 * SECTOR;
const PROBE_READ: usize = 8 * SECTOR;

/// Outcome of probing one admitted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MftProbe {
    /// The record's own sector divided by one of its LCNs gave a valid
    /// cluster size.
    Resolved {
        sectors_per_cluster: u32,
        mft_lcn: u64,
        mftmirr_lcn: u64,
        mft_record_size: u32,
    },
    /// Parsed fine but no divisor worked; still useful for pair
    /// correlation.
    Ambiguous { mft_lcn: u64, mftmirr_lcn: u64 },
    /// The record claims a zero allocation size.
    ZeroRecordSize,
    Unreadable,
}

/// What a full sweep produced.
pub struct ScanOutcome {
    pub resolved: Option<ResolvedMft>,
    pub observations: Vec<MftObservation>,
    pub stopped: bool,
}

/// A confirmed single-record resolution, including where it was seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedMft {
    pub sector: u64,
    pub sectors_per_cluster: u32,
    pub mft_lcn: u64,
    pub mftmirr_lcn: u64,
    pub mft_record_size: u32,
}

/// Probes a candidate MFT record: reads 8 sectors, takes the MFT LCN from
/// record 0, steps one record forward for the mirror LCN (record 1), and
/// tries to resolve the cluster size by division.
pub fn read_mft_info(
    dev: &mut dyn BlockDevice,
    partition: &Partition,
    mft_sector: u64,
) -> MftProbe {
    let mut buffer = vec![0u8; PROBE_READ];
    let offset = partition.offset + mft_sector * u64::from(dev.sector_size());
    if dev.read_at(offset, &mut buffer).is_err() {
        tracing::warn!("can't read candidate mft record at sector {mft_sector}");
        return MftProbe::Unreadable;
    }

    let mft_lcn = MftRecord::new(&buffer)
        .and_then(|r| r.data_start_lcn())
        .unwrap_or(0);
    let mft_record_size = read_le32(&buffer, 0x1C);
    if mft_record_size == 0 {
        tracing::warn!("mft probe failed: mft_record_size=0");
        return MftProbe::ZeroRecordSize;
    }

    let mftmirr_lcn = buffer
        .get(mft_record_size as usize..)
        .and_then(MftRecord::new)
        .and_then(|r| r.data_start_lcn())
        .unwrap_or(0);

    match spc_by_division(mft_sector, mft_lcn, mftmirr_lcn) {
        Some(sectors_per_cluster) => MftProbe::Resolved {
            sectors_per_cluster,
            mft_lcn,
            mftmirr_lcn,
            mft_record_size,
        },
        None => {
            tracing::warn!(
                "sectors_per_cluster unresolved: mft_lcn {mft_lcn}, mftmirr_lcn {mftmirr_lcn}, \
                 mft_record_size {mft_record_size}"
            );
            MftProbe::Ambiguous {
                mft_lcn,
                mftmirr_lcn,
            }
        }
    }
}

/// Runs phase A then phase B. The first resolution the operator accepts
/// ends the sweep; without expert mode the first resolution is accepted
/// outright.
pub fn scan_for_mft(
    dev: &mut dyn BlockDevice,
    partition: &Partition,
    ui: &mut dyn RebuildUi,
    expert: bool,
) -> ScanOutcome {
    let total = partition.total_sectors(dev.sector_size());
    let mut buffer = vec![0u8; CANDIDATE_READ];
    let mut outcome = ScanOutcome {
        resolved: None,
        observations: Vec::new(),
        stopped: false,
    };

    // Phase A: the window around the partition midpoint, in-use records
    // only.
    let mid = total / 2;
    let lo = if mid > MIRROR_WINDOW { mid - MIRROR_WINDOW } else { 1 };
    for sector in lo..total.min(mid + MIRROR_WINDOW + 1) {
        if visit_sector(dev, partition, sector, true, ui, expert, &mut buffer, &mut outcome) {
            return outcome;
        }
    }

    // Phase B: everything from sector 1 up. Re-visiting phase A's window
    // is harmless; duplicates cancel out in pair correlation.
    for sector in 1..total {
        if sector & PROGRESS_MASK == 0 {
            ui.progress(sector, total);
            if ui.stop_requested() {
                tracing::info!("mft search stopped: {sector}/{total}");
                outcome.stopped = true;
                return outcome;
            }
        }
        if visit_sector(dev, partition, sector, false, ui, expert, &mut buffer, &mut outcome) {
            return outcome;
        }
    }
    outcome
}

/// Examines one sector; returns true when the sweep should end.
#[allow(clippy::too_many_arguments)]
fn visit_sector(
    dev: &mut dyn BlockDevice,
    partition: &Partition,
    sector: u64,
    require_in_use: bool,
    ui: &mut dyn RebuildUi,
    expert: bool,
    buffer: &mut [u8],
    outcome: &mut ScanOutcome,
) -> bool {
    let offset = partition.offset + sector * u64::from(dev.sector_size());
    if dev.read_at(offset, buffer).is_err() {
        return false;
    }
    let Some(rec) = MftRecord::new(buffer) else {
        return false;
    };
    if !rec.is_plausible() {
        return false;
    }
    if require_in_use && rec.flags() != FLAG_IN_USE {
        return false;
    }
    if !rec.file_name_matches("$MFT") {
        return false;
    }
    tracing::info!("mft record at sector {sector}");

    match read_mft_info(dev, partition, sector) {
        MftProbe::Resolved {
            sectors_per_cluster,
            mft_lcn,
            mftmirr_lcn,
            mft_record_size,
        } => {
            tracing::info!("mft_lcn     {mft_lcn}");
            tracing::info!("mftmirr_lcn {mftmirr_lcn}");
            if !expert || ui.confirm(&format!("Use MFT from {mft_lcn}, confirm ? (Y/N)")) {
                outcome.resolved = Some(ResolvedMft {
                    sector,
                    sectors_per_cluster,
                    mft_lcn,
                    mftmirr_lcn,
                    mft_record_size,
                });
                return true;
            }
        }
        MftProbe::Ambiguous {
            mft_lcn,
            mftmirr_lcn,
        } => {
            if outcome.observations.len() < MAX_OBSERVATIONS {
                outcome.observations.push(MftObservation {
                    sector,
                    mft_lcn,
                    mftmirr_lcn,
                });
            } else {
                tracing::debug!("observation buffer full, dropping sector {sector}");
            }
        }
        MftProbe::ZeroRecordSize | MftProbe::Unreadable => {}
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::MemDevice;
    use crate::testutil::{raw_record, RecordSpec};
    use crate::ui::SilentUi;

    const SS: u64 = 512;

    /// A small partition image with an MFT record pair planted at
    /// `mft_sector` (record 0 naming `mft_lcn`, record 1 naming
    /// `mirr_lcn`).
    fn image_with_mft(total_sectors: u64, mft_sector: u64, mft_lcn: u64, mirr_lcn: u64) -> Vec<u8> {
        let mut data = vec![0u8; (total_sectors * SS) as usize];
        let at = (mft_sector * SS) as usize;
        data[at..at + 1024].copy_from_slice(&raw_record(&RecordSpec::mft(mft_lcn)));
        data[at + 1024..at + 2048].copy_from_slice(&raw_record(&RecordSpec::mftmirr(mirr_lcn)));
        data
    }

    #[test]
    fn probe_resolves_by_division() {
        // Sector 1024 = lcn 128 * spc 8.
        let data = image_with_mft(2048, 1024, 128, 900);
        let mut dev = MemDevice::new(data, 512);
        let part = Partition {
            offset: 0,
            size: 2048 * 512,
        };
        let probe = read_mft_info(&mut dev, &part, 1024);
        assert_eq!(
            probe,
            MftProbe::Resolved {
                sectors_per_cluster: 8,
                mft_lcn: 128,
                mftmirr_lcn: 900,
                mft_record_size: 1024,
            }
        );
    }

    #[test]
    fn probe_ambiguous_when_nothing_divides() {
        let data = image_with_mft(2048, 1021, 128, 900);
        let mut dev = MemDevice::new(data, 512);
        let part = Partition {
            offset: 0,
            size: 2048 * 512,
        };
        assert_eq!(
            read_mft_info(&mut dev, &part, 1021),
            MftProbe::Ambiguous {
                mft_lcn: 128,
                mftmirr_lcn: 900,
            }
        );
    }

    #[test]
    fn probe_rejects_zero_record_size() {
        let mut data = image_with_mft(2048, 1024, 128, 900);
        let at = 1024 * 512;
        data[at + 0x1C..at + 0x20].fill(0);
        let mut dev = MemDevice::new(data, 512);
        let part = Partition {
            offset: 0,
            size: 2048 * 512,
        };
        assert_eq!(read_mft_info(&mut dev, &part, 1024), MftProbe::ZeroRecordSize);
    }

    #[test]
    fn scan_finds_mirror_in_phase_a() {
        // Midpoint of a 16384-sector partition is 8192; a mirror record
        // there resolves as 8192 / 1024 = 8.
        let data = image_with_mft(16384, 8192, 128, 1024);
        let mut dev = MemDevice::new(data, 512);
        let part = Partition {
            offset: 0,
            size: 16384 * 512,
        };
        let mut ui = SilentUi::new(true);
        let outcome = scan_for_mft(&mut dev, &part, &mut ui, false);
        let resolved = outcome.resolved.expect("phase A should resolve");
        assert_eq!(resolved.sector, 8192);
        assert_eq!(resolved.sectors_per_cluster, 8);
        assert_eq!(resolved.mft_lcn, 128);
        assert_eq!(resolved.mftmirr_lcn, 1024);
    }

    #[test]
    fn scan_collects_observation_when_unresolved() {
        // Sector 1021 is not divisible by either LCN.
        let data = image_with_mft(4096, 1021, 128, 900);
        let mut dev = MemDevice::new(data, 512);
        let part = Partition {
            offset: 0,
            size: 4096 * 512,
        };
        let mut ui = SilentUi::new(true);
        let outcome = scan_for_mft(&mut dev, &part, &mut ui, false);
        assert!(outcome.resolved.is_none());
        assert_eq!(
            outcome.observations,
            vec![MftObservation {
                sector: 1021,
                mft_lcn: 128,
                mftmirr_lcn: 900,
            }]
        );
    }

    #[test]
    fn scan_ignores_records_not_named_mft() {
        let mut data = vec![0u8; 4096 * 512];
        let at = 1024 * 512;
        data[at..at + 1024].copy_from_slice(&raw_record(&RecordSpec::mftmirr(128)));
        let mut dev = MemDevice::new(data, 512);
        let part = Partition {
            offset: 0,
            size: 4096 * 512,
        };
        let mut ui = SilentUi::new(true);
        let outcome = scan_for_mft(&mut dev, &part, &mut ui, false);
        assert!(outcome.resolved.is_none());
        assert!(outcome.observations.is_empty());
    }

    #[test]
    fn expert_decline_keeps_scanning() {
        let data = image_with_mft(16384, 8192, 128, 1024);
        let mut dev = MemDevice::new(data, 512);
        let part = Partition {
            offset: 0,
            size: 16384 * 512,
        };
        let mut ui = SilentUi::new(false);
        let outcome = scan_for_mft(&mut dev, &part, &mut ui, true);
        // Declined in phase A and again in phase B; nothing resolved.
        assert!(outcome.resolved.is_none());
    }

    #[test]
    fn observation_buffer_is_bounded() {
        // Plant 12 unresolvable records (odd sectors, even LCNs, so no
        // division is ever exact); only 10 observations survive.
        let mut data = vec![0u8; 16384 * 512];
        for i in 0..12u64 {
            let sector = 3 + i * 2;
            let at = (sector * SS) as usize;
            data[at..at + 1024].copy_from_slice(&raw_record(&RecordSpec::mft(6)));
            data[at + 1024..at + 2048].copy_from_slice(&raw_record(&RecordSpec::mftmirr(10)));
        }
        let mut dev = MemDevice::new(data, 512);
        let part = Partition {
            offset: 0,
            size: 16384 * 512,
        };
        let mut ui = SilentUi::new(true);
        let outcome = scan_for_mft(&mut dev, &part, &mut ui, false);
        assert!(outcome.resolved.is_none());
        assert_eq!(outcome.observations.len(), MAX_OBSERVATIONS);
    }
}
