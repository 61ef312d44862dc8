use std::cmp::Ordering;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::utils::{chrom_eq, chrom_karyotype_key, normalize_chrom};

/// A closed genomic interval `[start, end]` on one chromosome.
///
/// Bounds are signed: a locus window around a variant near the start of a
/// chromosome keeps its exact `pos - radius` lower bound, even when negative.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GenomicInterval {
    pub chr: String,
    pub start: i64,
    pub end: i64,
}

impl GenomicInterval {
    pub fn new(chr: &str, start: i64, end: i64) -> Self {
        GenomicInterval {
            chr: normalize_chrom(chr),
            start,
            end,
        }
    }

    ///
    /// Interval spanning `[pos - radius, pos + radius]` on `chr`.
    ///
    pub fn around(chr: &str, pos: u64, radius: u64) -> Self {
        let pos = pos as i64;
        let radius = radius as i64;
        GenomicInterval::new(chr, pos - radius, pos + radius)
    }

    pub fn width(&self) -> u64 {
        (self.end - self.start) as u64
    }

    #[inline]
    pub fn contains(&self, chr: &str, pos: u64) -> bool {
        let pos = pos as i64;
        chrom_eq(&self.chr, chr) && self.start <= pos && pos <= self.end
    }

    #[inline]
    pub fn overlaps(&self, other: &GenomicInterval) -> bool {
        chrom_eq(&self.chr, &other.chr) && self.start <= other.end && other.start <= self.end
    }

    /// Start clamped at zero, for formats that cannot hold negative coordinates.
    pub fn clamped_start(&self) -> u64 {
        self.start.max(0) as u64
    }
}

impl Ord for GenomicInterval {
    fn cmp(&self, other: &Self) -> Ordering {
        chrom_karyotype_key(&self.chr)
            .cmp(&chrom_karyotype_key(&other.chr))
            .then(self.start.cmp(&other.start))
            .then(self.end.cmp(&other.end))
    }
}

impl PartialOrd for GenomicInterval {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for GenomicInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.chr, self.start, self.end)
    }
}
