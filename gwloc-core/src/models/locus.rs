use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::models::{GenomicInterval, Variant};
use crate::utils::normalize_chrom;

/// 1-based locus identifier, assigned in significance order of the lead variants.
pub type LocusId = u32;

///
/// An independent association signal: a lead variant plus the closed window
/// `[lead_pos - radius, lead_pos + radius]` on its chromosome.
///
/// Loci are created once by the locus definer and never modified afterwards.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Locus {
    pub id: LocusId,
    pub lead_id: String,
    pub chr: String,
    pub lead_pos: u64,
    pub lead_pval: f64,
    pub interval: GenomicInterval,
}

impl Locus {
    pub fn from_lead(id: LocusId, lead: &Variant, radius: u64) -> Self {
        Locus {
            id,
            lead_id: lead.id.clone(),
            chr: lead.chr.clone(),
            lead_pos: lead.pos,
            lead_pval: lead.pval,
            interval: GenomicInterval::around(&lead.chr, lead.pos, radius),
        }
    }

    pub fn contains(&self, chr: &str, pos: u64) -> bool {
        self.interval.contains(chr, pos)
    }

    pub fn distance_to_lead(&self, pos: u64) -> u64 {
        self.lead_pos.abs_diff(pos)
    }

    /// Label of the form `locus_<id>`.
    pub fn label(&self) -> String {
        format!("locus_{}", self.id)
    }
}

impl Display for Locus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} @ {})", self.label(), self.lead_id, self.interval)
    }
}

///
/// Membership of one significant variant in a locus.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocusAssignment {
    pub variant_id: String,
    pub chr: String,
    pub pos: u64,
    pub effect_allele: String,
    pub other_allele: String,
    pub pval: f64,
    pub locus_id: LocusId,
    pub is_lead: bool,
    pub distance_to_lead: u64,
}

impl LocusAssignment {
    /// `is_lead` comes from the clumping that built `locus`; a repeated row of
    /// the lead is not a second lead.
    pub fn new(variant: &Variant, locus: &Locus, is_lead: bool) -> Self {
        LocusAssignment {
            variant_id: variant.id.clone(),
            chr: variant.chr.clone(),
            pos: variant.pos,
            effect_allele: variant.effect_allele.clone(),
            other_allele: variant.other_allele.clone(),
            pval: variant.pval,
            locus_id: locus.id,
            is_lead,
            distance_to_lead: locus.distance_to_lead(variant.pos),
        }
    }

    /// Same key as [`Variant::identity`] for the assigned variant.
    pub fn identity(&self) -> (String, u64, String, String, String) {
        (
            normalize_chrom(&self.chr),
            self.pos,
            self.other_allele.clone(),
            self.effect_allele.clone(),
            self.variant_id.clone(),
        )
    }
}

///
/// Locus-definition flags for any input variant, significant or not.
///
/// Significant variants carry the locus they were clumped into; other variants
/// carry the locus whose window contains them, if any.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantAnnotation {
    pub variant_id: String,
    pub chr: String,
    pub pos: u64,
    pub pval: f64,
    pub significant: bool,
    pub is_lead: bool,
    pub locus_id: Option<LocusId>,
    pub distance_to_lead: Option<u64>,
}

impl VariantAnnotation {
    pub fn new(variant: &Variant, significant: bool, is_lead: bool, locus: Option<&Locus>) -> Self {
        VariantAnnotation {
            variant_id: variant.id.clone(),
            chr: variant.chr.clone(),
            pos: variant.pos,
            pval: variant.pval,
            significant,
            is_lead,
            locus_id: locus.map(|l| l.id),
            distance_to_lead: locus.map(|l| l.distance_to_lead(variant.pos)),
        }
    }
}

/// Where a locus ended up after the pipeline ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocusStatus {
    /// Defined but not fine-mapped (yet).
    Defined,
    FineMapped,
    NoData,
    NoValidVariants,
    TimedOut,
}

impl LocusStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocusStatus::Defined => "defined",
            LocusStatus::FineMapped => "fine_mapped",
            LocusStatus::NoData => "no_data",
            LocusStatus::NoValidVariants => "no_valid_variants",
            LocusStatus::TimedOut => "timed_out",
        }
    }
}

impl Display for LocusStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

///
/// One row of the locus table: the locus itself plus what fine-mapping made of it.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocusSummary {
    pub locus: Locus,
    /// Significant variants assigned to this locus, lead included.
    pub n_significant: usize,
    /// Variants extracted from the window (significant or not).
    pub n_window: usize,
    pub status: LocusStatus,
    pub credible_set_size: Option<usize>,
    pub credible_set_mass: Option<f64>,
    pub top_variant: Option<String>,
    pub top_posterior: Option<f64>,
}

impl LocusSummary {
    pub fn defined(locus: Locus, n_significant: usize) -> Self {
        LocusSummary {
            locus,
            n_significant,
            n_window: 0,
            status: LocusStatus::Defined,
            credible_set_size: None,
            credible_set_mass: None,
            top_variant: None,
            top_posterior: None,
        }
    }
}
