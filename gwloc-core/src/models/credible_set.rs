use serde::{Deserialize, Serialize};

use crate::models::LocusId;

///
/// Fine-mapping result for one variant in a locus window.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PosteriorRow {
    pub locus_id: LocusId,
    pub variant_id: String,
    pub chr: String,
    pub pos: u64,
    /// Natural-log approximate Bayes factor (alternative vs. null).
    pub log_abf: f64,
    pub posterior: f64,
    /// 1-based rank by descending posterior.
    pub rank: usize,
    /// Cumulative posterior of this row and every higher-ranked row.
    pub cumulative: f64,
    pub in_credible_set: bool,
}

///
/// Posterior probabilities for every variant in one locus window, ordered by
/// descending posterior, and the minimal prefix that reaches `coverage`.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredibleSet {
    pub locus_id: LocusId,
    pub coverage: f64,
    pub rows: Vec<PosteriorRow>,
}

impl CredibleSet {
    pub fn members(&self) -> &[PosteriorRow] {
        &self.rows[..self.size()]
    }

    pub fn size(&self) -> usize {
        self.rows.iter().take_while(|r| r.in_credible_set).count()
    }

    /// Cumulative posterior mass at the last member.
    pub fn mass(&self) -> f64 {
        self.members().last().map(|r| r.cumulative).unwrap_or(0.0)
    }

    pub fn top(&self) -> Option<&PosteriorRow> {
        self.rows.first()
    }

    pub fn is_singleton(&self) -> bool {
        self.size() == 1
    }

    pub fn total_posterior(&self) -> f64 {
        self.rows.iter().map(|r| r.posterior).sum()
    }
}
