//! Locus definition: clump genome-wide significant variants into independent loci.
//!
//! Significant variants are visited from most to least significant. A variant
//! further than `2 * radius` from every lead already on its chromosome becomes a
//! new lead with the window `lead ± radius`; any other variant joins the locus
//! with the nearest lead (the earlier locus on a tie). Leads on one chromosome
//! are therefore more than `2 * radius` apart, so windows never overlap, and
//! every window is exactly `lead ± radius`.
//!
//! Chromosomes are clumped independently in parallel; loci are then numbered
//! from 1 in global significance order of their leads. A significant row seen
//! twice (same site, alleles and identifier) is clumped once, keeping its most
//! significant copy, and the repeat is counted as a duplicate.

use std::collections::{BTreeMap, HashMap, HashSet};

use log::{debug, info};
use rayon::prelude::*;

use gwloc_core::{DropReason, GwlocConfig};
use gwloc_core::models::{Locus, LocusAssignment, LocusSummary, Variant};
use gwloc_core::utils::{chrom_karyotype_key, normalize_chrom};
use gwloc_io::{SumstatsError, VariantSource};

use crate::errors::Result;
use crate::report::DropCounts;

///
/// Output of locus definition.
///
#[derive(Debug, Clone, Default)]
pub struct LocusDefinition {
    /// Loci ordered by id (significance of the lead).
    pub loci: Vec<Locus>,
    /// One entry per significant variant, grouped by locus id, most significant first.
    pub assignments: Vec<LocusAssignment>,
    /// Data rows seen, including dropped ones.
    pub n_rows: usize,
    pub dropped: DropCounts,
}

impl LocusDefinition {
    pub fn n_significant(&self) -> usize {
        self.assignments.len()
    }

    ///
    /// Significant variants assigned to each locus, indexed like `loci`.
    ///
    pub fn members_per_locus(&self) -> Vec<usize> {
        let mut counts = vec![0; self.loci.len()];
        for a in &self.assignments {
            // ids are 1-based and dense
            if let Some(c) = counts.get_mut(a.locus_id as usize - 1) {
                *c += 1;
            }
        }
        counts
    }

    /// Locus table rows before fine-mapping.
    pub fn summaries(&self) -> Vec<LocusSummary> {
        self.loci
            .iter()
            .cloned()
            .zip(self.members_per_locus())
            .map(|(locus, n)| LocusSummary::defined(locus, n))
            .collect()
    }
}

/// A lead and the variants that joined it, lead first.
struct Clump {
    members: Vec<Variant>,
}

impl Clump {
    fn lead(&self) -> &Variant {
        &self.members[0]
    }
}

///
/// Greedy clumping of one chromosome's significant variants.
///
/// `variants` must already be sorted by [`Variant::cmp_significance`].
///
fn clump_chromosome(variants: Vec<Variant>, radius: u64) -> Vec<Clump> {
    let span = radius.saturating_mul(2);
    let mut clumps: Vec<Clump> = Vec::new();
    // lead position -> clump index
    let mut leads: BTreeMap<u64, usize> = BTreeMap::new();

    for variant in variants {
        let lo = variant.pos.saturating_sub(span);
        let hi = variant.pos.saturating_add(span);

        let mut nearest: Option<(u64, usize)> = None;
        for (lead_pos, &idx) in leads.range(lo..=hi) {
            let d = lead_pos.abs_diff(variant.pos);
            nearest = match nearest {
                Some((best_d, best_idx)) if (best_d, best_idx) <= (d, idx) => Some((best_d, best_idx)),
                _ => Some((d, idx)),
            };
        }

        match nearest {
            Some((_, idx)) => clumps[idx].members.push(variant),
            None => {
                leads.insert(variant.pos, clumps.len());
                clumps.push(Clump {
                    members: vec![variant],
                });
            }
        }
    }

    clumps
}

///
/// Define loci from significant variants that are already in memory.
///
/// Variants failing validation are counted and skipped, as are variants at or
/// above the threshold and those on chromosomes excluded by the config.
///
pub fn define_loci_from_variants(variants: Vec<Variant>, config: &GwlocConfig) -> LocusDefinition {
    let mut dropped = DropCounts::default();
    let n_rows = variants.len();
    let significant: Vec<Variant> = variants
        .into_iter()
        .filter(|v| match v.validate() {
            Ok(()) => true,
            Err(e) => {
                dropped.record(e.reason);
                false
            }
        })
        .filter(|v| v.pval < config.significance_threshold && config.includes_chrom(&v.chr))
        .collect();

    let mut definition = clump(significant, config.radius, &mut dropped);
    definition.n_rows = n_rows;
    definition.dropped = dropped;
    definition
}

///
/// Stream every row of `source`, keep the significant ones and define loci.
///
/// Schema errors abort; dropped rows are counted.
///
pub fn define_loci(source: &dyn VariantSource, config: &GwlocConfig) -> Result<LocusDefinition> {
    info!("Scanning {} for significant variants", source.describe());

    let mut n_rows = 0;
    let mut dropped = DropCounts::default();
    let mut significant = Vec::new();

    for row in source.stream_all()? {
        n_rows += 1;
        match row {
            Ok(v) => {
                if v.pval < config.significance_threshold && config.includes_chrom(&v.chr) {
                    significant.push(v);
                }
            }
            Err(SumstatsError::Dropped(e)) => {
                debug!("{}", e);
                dropped.record(e.reason);
            }
            Err(e) => return Err(e.into()),
        }
    }

    info!(
        "{} rows read, {} dropped, {} below p < {:e}",
        n_rows,
        dropped.total(),
        significant.len(),
        config.significance_threshold
    );

    let mut definition = clump(significant, config.radius, &mut dropped);
    definition.n_rows = n_rows;
    definition.dropped = dropped;

    info!("Defined {} loci", definition.loci.len());
    Ok(definition)
}

fn clump(significant: Vec<Variant>, radius: u64, dropped: &mut DropCounts) -> LocusDefinition {
    let mut by_chr: HashMap<String, Vec<Variant>> = HashMap::new();
    for v in significant {
        by_chr.entry(normalize_chrom(&v.chr)).or_default().push(v);
    }
    let mut groups: Vec<(String, Vec<Variant>)> = by_chr.into_iter().collect();
    groups.sort_by_key(|(chr, _)| chrom_karyotype_key(chr));

    let per_chrom: Vec<(Vec<Clump>, usize)> = groups
        .into_par_iter()
        .map(|(_, mut variants)| {
            variants.sort_by(|a, b| a.cmp_significance(b));
            let n = variants.len();
            let mut seen = HashSet::new();
            variants.retain(|v| seen.insert(v.identity()));
            let duplicates = n - variants.len();
            (clump_chromosome(variants, radius), duplicates)
        })
        .collect();

    let mut clumps: Vec<Clump> = Vec::new();
    for (chrom_clumps, duplicates) in per_chrom {
        if duplicates > 0 {
            debug!("{} duplicate significant rows dropped", duplicates);
        }
        dropped.record_n(DropReason::DuplicateVariant, duplicates);
        clumps.extend(chrom_clumps);
    }

    clumps.sort_by(|a, b| a.lead().cmp_significance(b.lead()));

    let mut loci = Vec::with_capacity(clumps.len());
    let mut assignments = Vec::new();
    for (i, clump) in clumps.iter().enumerate() {
        let locus = Locus::from_lead(i as u32 + 1, clump.lead(), radius);
        assignments.extend(
            clump
                .members
                .iter()
                .enumerate()
                .map(|(j, v)| LocusAssignment::new(v, &locus, j == 0)),
        );
        loci.push(locus);
    }

    LocusDefinition {
        loci,
        assignments,
        ..Default::default()
    }
}
