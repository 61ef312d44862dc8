use std::collections::HashMap;

use gwloc_core::models::Locus;
use gwloc_core::utils::normalize_chrom;

#[derive(Debug, Clone, Default)]
struct ChromWindows {
    /// (start, end, position in the locus list), sorted by start
    windows: Vec<(i64, i64, usize)>,
    /// Width of the widest window
    max_len: i64,
}

///
/// Per-chromosome lookup of the locus windows containing a position.
///
/// Windows are kept sorted by start; a query binary-searches for the first
/// window that could still reach the position (its start is at most
/// `max_len` before it) and scans forward until starts pass the position.
/// With the disjoint windows the locus definer produces, a query touches at
/// most a couple of windows.
///
/// # Examples
///
/// ```
/// use gwloc_core::models::{Locus, Variant};
/// use gwloc_finemap::LocusIndex;
///
/// let lead = Variant::new("1", 1_000_000, "A", "G", 0.4, 0.05, 1e-12);
/// let loci = vec![Locus::from_lead(1, &lead, 250_000)];
/// let index = LocusIndex::new(&loci);
///
/// assert_eq!(index.find("chr1", 800_000), vec![0]);
/// assert!(index.find("1", 1_250_001).is_empty());
/// assert!(index.find("2", 1_000_000).is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct LocusIndex {
    chroms: HashMap<String, ChromWindows>,
}

impl LocusIndex {
    pub fn new(loci: &[Locus]) -> Self {
        let mut chroms: HashMap<String, ChromWindows> = HashMap::new();
        for (i, locus) in loci.iter().enumerate() {
            let entry = chroms
                .entry(normalize_chrom(&locus.interval.chr))
                .or_default();
            let iv = &locus.interval;
            entry.windows.push((iv.start, iv.end, i));
            entry.max_len = entry.max_len.max(iv.end - iv.start);
        }
        for entry in chroms.values_mut() {
            entry.windows.sort_unstable();
        }
        LocusIndex { chroms }
    }

    ///
    /// Positions (in the slice the index was built from) of every locus whose
    /// window contains `chr:pos`, bounds inclusive.
    ///
    pub fn find(&self, chr: &str, pos: u64) -> Vec<usize> {
        let Some(entry) = self.chroms.get(&normalize_chrom(chr)) else {
            return Vec::new();
        };
        let pos = pos as i64;
        let first = entry
            .windows
            .partition_point(|(start, _, _)| *start < pos - entry.max_len);
        entry.windows[first..]
            .iter()
            .take_while(|(start, _, _)| *start <= pos)
            .filter(|(_, end, _)| *end >= pos)
            .map(|(_, _, i)| *i)
            .collect()
    }

    pub fn n_chroms(&self) -> usize {
        self.chroms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chroms.is_empty()
    }
}
