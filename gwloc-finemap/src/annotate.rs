//! Per-variant flags: one record for every valid input row, saying whether it
//! is significant, whether it leads a locus, and which locus owns it.

use std::collections::{HashMap, HashSet};

use log::info;

use gwloc_core::GwlocConfig;
use gwloc_core::models::{Locus, Variant, VariantAnnotation};
use gwloc_io::{SumstatsError, VariantSource};

use crate::errors::Result;
use crate::index::LocusIndex;
use crate::loci::LocusDefinition;

type Identity = (String, u64, String, String, String);

///
/// Flags variants against a finished locus definition.
///
/// Significant variants get the locus they were clumped into, which may lie
/// up to `2 * radius` from its lead. Any other variant gets the locus whose
/// window contains it, or none. A repeat of a significant variant yields
/// nothing; locus definition already counted it as a duplicate.
///
pub struct VariantAnnotator<'a> {
    loci: &'a [Locus],
    index: LocusIndex,
    /// identity -> (position in `loci`, is lead)
    members: HashMap<Identity, (usize, bool)>,
    emitted: HashSet<Identity>,
    config: &'a GwlocConfig,
}

impl<'a> VariantAnnotator<'a> {
    pub fn new(definition: &'a LocusDefinition, config: &'a GwlocConfig) -> Self {
        let position: HashMap<_, _> = definition
            .loci
            .iter()
            .enumerate()
            .map(|(i, l)| (l.id, i))
            .collect();

        let members = definition
            .assignments
            .iter()
            .filter_map(|a| {
                position
                    .get(&a.locus_id)
                    .map(|&i| (a.identity(), (i, a.is_lead)))
            })
            .collect();

        VariantAnnotator {
            loci: &definition.loci,
            index: LocusIndex::new(&definition.loci),
            members,
            emitted: HashSet::new(),
            config,
        }
    }

    pub fn annotate(&mut self, variant: &Variant) -> Option<VariantAnnotation> {
        let significant = variant.pval < self.config.significance_threshold
            && self.config.includes_chrom(&variant.chr);

        if significant {
            let key = variant.identity();
            if let Some(&(i, is_lead)) = self.members.get(&key) {
                if !self.emitted.insert(key) {
                    return None;
                }
                return Some(VariantAnnotation::new(
                    variant,
                    true,
                    is_lead,
                    Some(&self.loci[i]),
                ));
            }
        }

        // windows never overlap, so there is at most one hit
        let locus = self
            .index
            .find(&variant.chr, variant.pos)
            .first()
            .map(|&i| &self.loci[i]);
        Some(VariantAnnotation::new(variant, significant, false, locus))
    }
}

///
/// Stream `source` once and pass the annotation of every valid row to `emit`,
/// in source order. Rows that fail validation are skipped; schema errors and
/// errors returned by `emit` abort.
///
/// Returns the number of annotations emitted.
///
pub fn annotate_variants<F>(
    source: &dyn VariantSource,
    definition: &LocusDefinition,
    config: &GwlocConfig,
    mut emit: F,
) -> Result<usize>
where
    F: FnMut(&VariantAnnotation) -> std::io::Result<()>,
{
    let mut annotator = VariantAnnotator::new(definition, config);
    let mut n = 0;

    for row in source.stream_all()? {
        match row {
            Ok(v) => {
                if let Some(annotation) = annotator.annotate(&v) {
                    emit(&annotation)?;
                    n += 1;
                }
            }
            Err(SumstatsError::Dropped(_)) => {}
            Err(e) => return Err(e.into()),
        }
    }

    info!("Annotated {} variants from {}", n, source.describe());
    Ok(n)
}

/// [`annotate_variants`] collected into memory.
pub fn annotate_all(
    source: &dyn VariantSource,
    definition: &LocusDefinition,
    config: &GwlocConfig,
) -> Result<Vec<VariantAnnotation>> {
    let mut out = Vec::new();
    annotate_variants(source, definition, config, |a| {
        out.push(a.clone());
        Ok(())
    })?;
    Ok(out)
}
