//! Window extraction: every variant, significant or not, inside each locus window.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use log::{debug, info};

use gwloc_core::DropReason;
use gwloc_core::models::{Locus, LocusId, Variant};
use gwloc_io::{SumstatsError, VariantSource};

use crate::errors::{LocusError, Result};
use crate::index::LocusIndex;
use crate::report::DropCounts;

/// Rows between deadline checks while streaming a window.
const DEADLINE_CHECK_INTERVAL: usize = 1024;

///
/// Cooperative per-locus time limit. `None` never expires.
///
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    locus: LocusId,
    started: Instant,
    limit: Option<Duration>,
}

impl Deadline {
    pub fn new(locus: LocusId, timeout_secs: Option<u64>) -> Self {
        Deadline {
            locus,
            started: Instant::now(),
            limit: timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn unlimited(locus: LocusId) -> Self {
        Deadline::new(locus, None)
    }

    pub fn check(&self) -> std::result::Result<(), LocusError> {
        match self.limit {
            Some(limit) if self.started.elapsed() >= limit => Err(LocusError::Timeout {
                locus: self.locus,
                secs: limit.as_secs(),
            }),
            _ => Ok(()),
        }
    }
}

///
/// The rows extracted for one locus.
///
#[derive(Debug, Clone)]
pub struct LocusWindow {
    pub locus: Locus,
    /// Rows that passed validation, in source order, each variant once.
    pub variants: Vec<Variant>,
    /// Rows inside the window, dropped ones included.
    pub n_rows: usize,
    pub dropped: DropCounts,
    seen: HashSet<(String, u64, String, String, String)>,
}

impl LocusWindow {
    pub fn new(locus: Locus) -> Self {
        LocusWindow {
            locus,
            variants: Vec::new(),
            n_rows: 0,
            dropped: DropCounts::default(),
            seen: HashSet::new(),
        }
    }

    /// Build a window directly from rows already known to lie inside it.
    pub fn from_variants(locus: Locus, variants: Vec<Variant>) -> Self {
        let mut window = LocusWindow::new(locus);
        for v in variants {
            match v.validate() {
                Ok(()) => window.push(v),
                Err(e) => window.drop_row(e.reason),
            }
        }
        window
    }

    ///
    /// Add a valid row. A repeat of a variant already in the window is counted
    /// as a duplicate, so it cannot take posterior mass twice.
    ///
    pub fn push(&mut self, variant: Variant) {
        self.n_rows += 1;
        if self.seen.insert(variant.identity()) {
            self.variants.push(variant);
        } else {
            self.dropped.record(DropReason::DuplicateVariant);
        }
    }

    /// Count a row inside the window that failed validation.
    pub fn drop_row(&mut self, reason: DropReason) {
        self.n_rows += 1;
        self.dropped.record(reason);
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }
}

///
/// Extract one locus window with a range query against `source`.
///
/// Safe to call concurrently for different loci; sources are read-only.
///
pub fn extract_window(
    source: &dyn VariantSource,
    locus: &Locus,
    deadline: &Deadline,
) -> Result<LocusWindow> {
    let mut window = LocusWindow::new(locus.clone());

    for (i, row) in source.stream_region(&locus.interval)?.enumerate() {
        if i % DEADLINE_CHECK_INTERVAL == 0 {
            deadline.check()?;
        }
        match row {
            Ok(v) => window.push(v),
            Err(SumstatsError::Dropped(e)) => window.drop_row(e.reason),
            Err(e) => return Err(e.into()),
        }
    }

    debug!(
        "{}: {} rows, {} dropped",
        locus.label(),
        window.n_rows,
        window.dropped.total()
    );
    Ok(window)
}

///
/// Extract every locus window in one streaming pass over `source`.
///
/// Each row is placed through a [`LocusIndex`], so the cost is one read of the
/// source regardless of the number of loci. Dropped rows are attributed to a
/// window when their position is known; rows that cannot be placed are skipped
/// here (locus definition already counted them). The returned windows are in
/// the same order as `loci`.
///
pub fn extract_windows(source: &dyn VariantSource, loci: &[Locus]) -> Result<Vec<LocusWindow>> {
    let index = LocusIndex::new(loci);
    let mut windows: Vec<LocusWindow> = loci.iter().cloned().map(LocusWindow::new).collect();

    info!(
        "Extracting {} locus windows on {} chromosomes from {} in one pass",
        loci.len(),
        index.n_chroms(),
        source.describe()
    );

    for row in source.stream_all()? {
        match row {
            Ok(v) => {
                for i in index.find(&v.chr, v.pos) {
                    windows[i].push(v.clone());
                }
            }
            Err(SumstatsError::Dropped(e)) => {
                if let Some((chr, pos)) = &e.site {
                    for i in index.find(chr, *pos) {
                        windows[i].drop_row(e.reason);
                    }
                }
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(windows)
}
