//! Geometry inference from observed MFT record positions.
//!
//! A record's physical sector and the LCNs it names are tied together by
//! `sector = lcn * sectors_per_cluster`, so an unknown cluster size falls
//! out of integer division. A single observation resolves when the
//! division is exact and yields a power of two; otherwise pairs of
//! observations cancel the unknown partition offset:
//! `sector_j - sector_i = sectors_per_cluster * (lcn_j - lcn_i)`.

use crate::device::Partition;

/// At most this many observations are kept; later ones are silently
/// dropped.
pub const MAX_OBSERVATIONS: usize = 10;

/// One admitted MFT record sighting, harvested during the sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MftObservation {
    /// Sector index within the partition.
    pub sector: u64,
    pub mft_lcn: u64,
    pub mftmirr_lcn: u64,
}

/// A cluster size plus the partition offset it would imply, derived from
/// one observation pair. Reported to the operator, never applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionHint {
    pub sectors_per_cluster: u32,
    pub part_offset: u64,
}

fn valid_spc(q: u64) -> bool {
    matches!(q, 1 | 2 | 4 | 8 | 16 | 32 | 64 | 128)
}

/// Guesses `sectors_per_cluster` from one record's sector and the two LCNs
/// it names. The record may be the primary MFT or the mirror, so both
/// divisors are tried - the larger first, because the smaller LCN can
/// divide the sector exactly and still produce a bogus quotient when it
/// also divides the larger.
pub fn spc_by_division(mft_sector: u64, mft_lcn: u64, mftmirr_lcn: u64) -> Option<u32> {
    let (first, second) = if mft_lcn < mftmirr_lcn {
        (mftmirr_lcn, mft_lcn)
    } else {
        (mft_lcn, mftmirr_lcn)
    };
    for lcn in [first, second] {
        if lcn > 0 && mft_sector % lcn == 0 {
            let q = mft_sector / lcn;
            if valid_spc(q) {
                return Some(q as u32);
            }
        }
    }
    None
}

/// Cross-correlates every observation pair under the four role
/// assignments - (mft_i, mftmirr_j) and (mftmirr_i, mft_j), each with both
/// orderings of the LCN difference. The search space is bounded by
/// C(10,2) * 4 = 180 trials, so the enumeration is exhaustive.
pub fn correlate_pairs(
    observations: &[MftObservation],
    partition: &Partition,
    sector_size: u32,
) -> Vec<PartitionHint> {
    let mut hints = Vec::new();
    for (i, a) in observations.iter().enumerate() {
        for b in &observations[i + 1..] {
            let sector_delta = b.sector as i64 - a.sector as i64;
            // The anchor LCN is observation i's LCN in the role being
            // tried; it positions the partition start once spc is known.
            for (lcn_a, lcn_b) in [(a.mft_lcn, b.mftmirr_lcn), (a.mftmirr_lcn, b.mft_lcn)] {
                let anchor = lcn_a;
                let lcn_delta = (lcn_a as i64 - lcn_b as i64).abs();
                if lcn_delta == 0 || sector_delta % lcn_delta != 0 {
                    continue;
                }
                let q = sector_delta / lcn_delta;
                if q <= 0 || !valid_spc(q as u64) {
                    continue;
                }
                let shift = a.sector as i64 - anchor as i64 * q;
                let offset = partition.offset as i64 + shift * i64::from(sector_size);
                if offset < 0 {
                    tracing::debug!(
                        "pair ({}, {}) implies a negative partition offset, ignored",
                        a.sector,
                        b.sector
                    );
                    continue;
                }
                hints.push(PartitionHint {
                    sectors_per_cluster: q as u32,
                    part_offset: offset as u64,
                });
            }
        }
    }
    hints
}
