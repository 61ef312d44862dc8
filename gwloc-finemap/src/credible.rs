use std::cmp::Ordering;

use gwloc_core::config::PriorConfig;
use gwloc_core::models::{CredibleSet, LocusId, PosteriorRow, Variant};
use gwloc_core::utils::{chrom_karyotype_key, log_sum_exp};

use crate::abf::variant_log_abf;
use crate::errors::LocusError;
use crate::report::DropCounts;
use crate::window::{Deadline, LocusWindow};

/// A variant with its log Bayes factor.
#[derive(Debug, Clone, Copy)]
pub struct Scored<'a> {
    pub variant: &'a Variant,
    pub log_abf: f64,
}

///
/// Log Bayes factors for every usable variant of a window. Variants the prior
/// cannot score are counted in `dropped`.
///
pub fn score_window<'a>(
    window: &'a LocusWindow,
    prior: &PriorConfig,
    dropped: &mut DropCounts,
) -> Vec<Scored<'a>> {
    window
        .variants
        .iter()
        .filter_map(|variant| match variant_log_abf(variant, prior) {
            Ok(log_abf) => Some(Scored { variant, log_abf }),
            Err(e) => {
                dropped.record(e.reason);
                None
            }
        })
        .collect()
}

fn by_descending_abf(a: &Scored, b: &Scored) -> Ordering {
    b.log_abf
        .total_cmp(&a.log_abf)
        .then_with(|| chrom_karyotype_key(&a.variant.chr).cmp(&chrom_karyotype_key(&b.variant.chr)))
        .then_with(|| a.variant.pos.cmp(&b.variant.pos))
        .then_with(|| a.variant.id.cmp(&b.variant.id))
}

///
/// Posterior probabilities and the credible set from scored variants.
///
/// Posteriors are `exp(ln ABF_i - logsumexp(ln ABF))` under a single causal
/// variant with a flat prior over the window. Rows are ranked by descending
/// posterior (ties by position); the set is the shortest prefix whose
/// cumulative posterior reaches `coverage`. If rounding keeps the running sum
/// just below a coverage of 1, every row is included.
///
pub fn credible_set_from_scores(locus_id: LocusId, mut scored: Vec<Scored>, coverage: f64) -> CredibleSet {
    scored.sort_by(by_descending_abf);

    let log_abfs: Vec<f64> = scored.iter().map(|s| s.log_abf).collect();
    let log_total = log_sum_exp(&log_abfs);

    let mut rows = Vec::with_capacity(scored.len());
    let mut cumulative = 0.0;
    let mut reached = false;
    for (i, s) in scored.iter().enumerate() {
        let posterior = (s.log_abf - log_total).exp();
        cumulative += posterior;
        rows.push(PosteriorRow {
            locus_id,
            variant_id: s.variant.id.clone(),
            chr: s.variant.chr.clone(),
            pos: s.variant.pos,
            log_abf: s.log_abf,
            posterior,
            rank: i + 1,
            cumulative,
            in_credible_set: !reached,
        });
        if cumulative >= coverage {
            reached = true;
        }
    }

    CredibleSet {
        locus_id,
        coverage,
        rows,
    }
}

///
/// Fine-map one locus window.
///
/// # Errors
/// - [`LocusError::NoData`] when the window has no rows at all
/// - [`LocusError::NoValidVariants`] when every row was dropped
/// - [`LocusError::Timeout`] when `deadline` passes before the set is built
///
pub fn compute_credible_set(
    window: &LocusWindow,
    prior: &PriorConfig,
    coverage: f64,
    deadline: &Deadline,
    dropped: &mut DropCounts,
) -> Result<CredibleSet, LocusError> {
    let locus = window.locus.id;
    if window.is_empty() {
        return Err(LocusError::NoData(locus));
    }
    deadline.check()?;

    let scored = score_window(window, prior, dropped);
    if scored.is_empty() {
        return Err(LocusError::NoValidVariants {
            locus,
            dropped: window.n_rows,
        });
    }
    deadline.check()?;

    Ok(credible_set_from_scores(locus, scored, coverage))
}
