//! What happened during a run: per-variant drops counted by reason, per-locus
//! warnings, and the totals that end up in the JSON run summary.

use std::collections::BTreeMap;
use std::ops::AddAssign;

use log::{info, warn};
use serde::Serialize;

use gwloc_core::models::{LocusId, LocusStatus};
use gwloc_core::{DropReason, GwlocConfig};

use crate::errors::LocusError;

/// Dropped-row counts keyed by reason.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DropCounts(BTreeMap<DropReason, usize>);

impl DropCounts {
    pub fn record(&mut self, reason: DropReason) {
        self.record_n(reason, 1);
    }

    pub fn record_n(&mut self, reason: DropReason, n: usize) {
        if n > 0 {
            *self.0.entry(reason).or_insert(0) += n;
        }
    }

    pub fn get(&self, reason: DropReason) -> usize {
        self.0.get(&reason).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DropReason, &usize)> {
        self.0.iter()
    }
}

impl AddAssign<&DropCounts> for DropCounts {
    fn add_assign(&mut self, other: &DropCounts) {
        for (reason, n) in other.iter() {
            *self.0.entry(*reason).or_insert(0) += n;
        }
    }
}

///
/// A locus that produced no credible set, and why.
///
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocusWarning {
    pub locus_id: LocusId,
    pub lead_variant: String,
    pub status: LocusStatus,
    pub message: String,
}

impl LocusWarning {
    pub fn new(lead_variant: &str, error: &LocusError) -> Self {
        LocusWarning {
            locus_id: error.locus(),
            lead_variant: lead_variant.to_string(),
            status: error.status(),
            message: error.to_string(),
        }
    }
}

///
/// End-of-run report. Written as JSON next to the output tables and logged.
///
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub genome_build: String,
    pub config: GwlocConfig,
    /// Data rows read during locus definition (valid or not).
    pub n_rows: usize,
    pub n_significant: usize,
    pub n_loci: usize,
    pub n_fine_mapped: usize,
    /// Rows dropped while scanning for significant variants.
    pub dropped: DropCounts,
    /// Rows dropped from locus windows before fine-mapping.
    pub window_dropped: DropCounts,
    pub warnings: Vec<LocusWarning>,
}

impl RunSummary {
    pub fn new(config: &GwlocConfig) -> Self {
        RunSummary {
            genome_build: config.genome_build.clone(),
            config: config.clone(),
            n_rows: 0,
            n_significant: 0,
            n_loci: 0,
            n_fine_mapped: 0,
            dropped: DropCounts::default(),
            window_dropped: DropCounts::default(),
            warnings: Vec::new(),
        }
    }

    pub fn n_failed(&self) -> usize {
        self.warnings.len()
    }

    pub fn log(&self) {
        info!(
            "{} rows read, {} significant, {} loci, {} fine-mapped, {} failed",
            self.n_rows,
            self.n_significant,
            self.n_loci,
            self.n_fine_mapped,
            self.n_failed()
        );
        for (reason, n) in self.dropped.iter() {
            warn!("dropped {} rows from the input: {}", n, reason);
        }
        for (reason, n) in self.window_dropped.iter() {
            warn!("dropped {} rows from locus windows: {}", n, reason);
        }
        for w in &self.warnings {
            warn!("{} ({}): {}", w.lead_variant, w.status, w.message);
        }
    }
}
