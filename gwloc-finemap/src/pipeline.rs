use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use rayon::prelude::*;

use gwloc_core::GwlocConfig;
use gwloc_core::models::{CredibleSet, Locus, LocusStatus, LocusSummary};
use gwloc_io::VariantSource;

use crate::credible::compute_credible_set;
use crate::errors::{FinemapError, Result};
use crate::loci::{LocusDefinition, define_loci};
use crate::report::{DropCounts, LocusWarning, RunSummary};
use crate::window::{Deadline, LocusWindow, extract_window, extract_windows};

///
/// How locus windows are pulled from the source.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Extraction {
    /// One streaming pass over the source for all loci, then parallel fine-mapping.
    #[default]
    SinglePass,
    /// A range query per locus, issued from the worker threads.
    PerLocus,
}

///
/// Everything fine-mapping produced, in locus order.
///
#[derive(Debug, Clone)]
pub struct FineMapOutput {
    pub summaries: Vec<LocusSummary>,
    pub credible_sets: Vec<CredibleSet>,
    pub window_dropped: DropCounts,
    pub warnings: Vec<LocusWarning>,
}

///
/// Output of a full run: locus definition followed by fine-mapping.
///
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub definition: LocusDefinition,
    pub fine_mapped: FineMapOutput,
    pub summary: RunSummary,
}

struct LocusOutcome {
    summary: LocusSummary,
    credible_set: Option<CredibleSet>,
    dropped: DropCounts,
    warning: Option<LocusWarning>,
}

fn progress_bar(len: usize) -> ProgressBar {
    let bar = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} loci") {
        bar.set_style(style);
    }
    bar
}

fn build_pool(config: &GwlocConfig) -> Result<rayon::ThreadPool> {
    // zero lets rayon size the pool to the available cores
    Ok(rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads.unwrap_or(0))
        .build()?)
}

fn fine_map_one(
    source: Option<&dyn VariantSource>,
    window: Option<LocusWindow>,
    locus: &Locus,
    n_significant: usize,
    config: &GwlocConfig,
) -> Result<LocusOutcome> {
    let deadline = Deadline::new(locus.id, config.locus_timeout_secs);
    let mut summary = LocusSummary::defined(locus.clone(), n_significant);
    let mut dropped = DropCounts::default();

    let extracted = match (window, source) {
        (Some(window), _) => Ok(window),
        (None, Some(source)) => extract_window(source, locus, &deadline),
        (None, None) => Ok(LocusWindow::new(locus.clone())),
    };

    let result = extracted.and_then(|window| {
        summary.n_window = window.n_rows;
        dropped += &window.dropped;
        compute_credible_set(&window, &config.prior, config.coverage, &deadline, &mut dropped)
            .map_err(FinemapError::from)
    });

    match result {
        Ok(cs) => {
            summary.status = LocusStatus::FineMapped;
            summary.credible_set_size = Some(cs.size());
            summary.credible_set_mass = Some(cs.mass());
            summary.top_variant = cs.top().map(|r| r.variant_id.clone());
            summary.top_posterior = cs.top().map(|r| r.posterior);
            Ok(LocusOutcome {
                summary,
                credible_set: Some(cs),
                dropped,
                warning: None,
            })
        }
        Err(FinemapError::Locus(e)) => {
            warn!("{}", e);
            summary.status = e.status();
            Ok(LocusOutcome {
                summary,
                credible_set: None,
                dropped,
                warning: Some(LocusWarning::new(&locus.lead_id, &e)),
            })
        }
        Err(e) => Err(e),
    }
}

///
/// Fine-map every locus against `source`.
///
/// `n_significant` gives the number of significant variants per locus (same
/// order as `loci`) and is only reported. Loci are processed in parallel on a
/// pool sized by `config.threads`; a failing locus is recorded as a warning and
/// does not stop the others, while schema and I/O errors abort.
///
pub fn fine_map_loci(
    source: &dyn VariantSource,
    loci: &[Locus],
    n_significant: &[usize],
    config: &GwlocConfig,
    extraction: Extraction,
) -> Result<FineMapOutput> {
    config.validate()?;
    let pool = build_pool(config)?;
    let count = |i: usize| n_significant.get(i).copied().unwrap_or(0);

    info!(
        "Fine-mapping {} loci on {} threads (coverage {}, prior sd {})",
        loci.len(),
        pool.current_num_threads(),
        config.coverage,
        config.prior.sd
    );

    let bar = progress_bar(loci.len());

    let outcomes: Vec<LocusOutcome> = match extraction {
        Extraction::SinglePass => {
            let windows = extract_windows(source, loci)?;
            pool.install(|| {
                windows
                    .into_par_iter()
                    .zip(loci.par_iter())
                    .enumerate()
                    .map(|(i, (window, locus))| {
                        let outcome = fine_map_one(None, Some(window), locus, count(i), config);
                        bar.inc(1);
                        outcome
                    })
                    .collect::<Result<Vec<_>>>()
            })?
        }
        Extraction::PerLocus => pool.install(|| {
            loci.par_iter()
                .enumerate()
                .map(|(i, locus)| {
                    let outcome = fine_map_one(Some(source), None, locus, count(i), config);
                    bar.inc(1);
                    outcome
                })
                .collect::<Result<Vec<_>>>()
        })?,
    };
    bar.finish_and_clear();

    let mut output = FineMapOutput {
        summaries: Vec::with_capacity(outcomes.len()),
        credible_sets: Vec::new(),
        window_dropped: DropCounts::default(),
        warnings: Vec::new(),
    };
    for outcome in outcomes {
        output.summaries.push(outcome.summary);
        output.credible_sets.extend(outcome.credible_set);
        output.window_dropped += &outcome.dropped;
        output.warnings.extend(outcome.warning);
    }

    info!(
        "{} of {} loci fine-mapped",
        output.credible_sets.len(),
        loci.len()
    );
    Ok(output)
}

///
/// Define loci from `source` and fine-map each of them.
///
pub fn run_pipeline(
    source: &dyn VariantSource,
    config: &GwlocConfig,
    extraction: Extraction,
) -> Result<PipelineOutput> {
    config.validate()?;

    let definition = define_loci(source, config)?;
    let fine_mapped = fine_map_loci(
        source,
        &definition.loci,
        &definition.members_per_locus(),
        config,
        extraction,
    )?;

    let mut summary = RunSummary::new(config);
    summary.n_rows = definition.n_rows;
    summary.n_significant = definition.n_significant();
    summary.n_loci = definition.loci.len();
    summary.n_fine_mapped = fine_mapped.credible_sets.len();
    summary.dropped = definition.dropped.clone();
    summary.window_dropped = fine_mapped.window_dropped.clone();
    summary.warnings = fine_mapped.warnings.clone();

    Ok(PipelineOutput {
        definition,
        fine_mapped,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gwloc_core::models::Variant;
    use gwloc_io::InMemorySource;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn source() -> InMemorySource {
        InMemorySource::new(vec![
            Variant::new("1", 1_000_000, "A", "G", 0.30, 0.03, 1e-20),
            Variant::new("1", 1_000_500, "A", "G", 0.20, 0.03, 1e-11),
            Variant::new("1", 1_100_000, "A", "G", 0.01, 0.03, 0.7),
            Variant::new("5", 2_000_000, "C", "T", -0.25, 0.04, 1e-9),
        ])
    }

    #[fixture]
    fn config() -> GwlocConfig {
        GwlocConfig {
            threads: Some(2),
            ..Default::default()
        }
    }

    #[rstest]
    #[case(Extraction::SinglePass)]
    #[case(Extraction::PerLocus)]
    fn test_run_pipeline(source: InMemorySource, config: GwlocConfig, #[case] extraction: Extraction) {
        let out = run_pipeline(&source, &config, extraction).unwrap();
        assert_eq!(out.summary.n_rows, 4);
        assert_eq!(out.summary.n_loci, 2);
        assert_eq!(out.summary.n_fine_mapped, 2);
        assert!(out.summary.warnings.is_empty());

        let first = &out.fine_mapped.summaries[0];
        assert_eq!(first.status, LocusStatus::FineMapped);
        assert_eq!(first.n_significant, 2);
        assert_eq!(first.n_window, 3);
        assert_eq!(first.top_variant.as_deref(), Some("1:1000000:G:A"));
        assert_eq!(out.fine_mapped.summaries[1].credible_set_size, Some(1));
    }

    #[rstest]
    #[case(Extraction::SinglePass)]
    #[case(Extraction::PerLocus)]
    fn test_timeout_is_recorded_per_locus(
        source: InMemorySource,
        mut config: GwlocConfig,
        #[case] extraction: Extraction,
    ) {
        config.locus_timeout_secs = Some(0);
        let out = run_pipeline(&source, &config, extraction).unwrap();
        assert_eq!(out.summary.n_fine_mapped, 0);
        assert_eq!(out.summary.warnings.len(), 2);
        assert!(
            out.fine_mapped
                .summaries
                .iter()
                .all(|s| s.status == LocusStatus::TimedOut)
        );
    }

    #[rstest]
    fn test_invalid_config_aborts(source: InMemorySource, mut config: GwlocConfig) {
        config.coverage = 1.5;
        assert!(matches!(
            run_pipeline(&source, &config, Extraction::SinglePass),
            Err(FinemapError::Config(_))
        ));
    }
}
