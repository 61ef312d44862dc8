use std::cmp::Ordering;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::errors::{DropReason, VariantError};
use crate::utils::{chrom_karyotype_key, normalize_chrom};

///
/// One row of GWAS summary statistics.
///
/// Chromosome, position and the two alleles identify a variant within one
/// genome build. Records are never mutated by the analysis; derived values
/// live in separate output rows.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub id: String,
    pub chr: String,
    pub pos: u64,
    pub effect_allele: String,
    pub other_allele: String,
    pub beta: f64,
    pub se: f64,
    pub pval: f64,
    pub eaf: Option<f64>,
    pub n_eff: Option<f64>,
}

impl Variant {
    ///
    /// Build a variant with a generated `chr:pos:other:effect` identifier.
    ///
    pub fn new(
        chr: &str,
        pos: u64,
        effect_allele: &str,
        other_allele: &str,
        beta: f64,
        se: f64,
        pval: f64,
    ) -> Self {
        let chr = normalize_chrom(chr);
        let effect_allele = effect_allele.to_ascii_uppercase();
        let other_allele = other_allele.to_ascii_uppercase();
        Variant {
            id: default_variant_id(&chr, pos, &other_allele, &effect_allele),
            chr,
            pos,
            effect_allele,
            other_allele,
            beta,
            se,
            pval,
            eaf: None,
            n_eff: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_eaf(mut self, eaf: f64) -> Self {
        self.eaf = Some(eaf);
        self
    }

    pub fn with_n_eff(mut self, n_eff: f64) -> Self {
        self.n_eff = Some(n_eff);
        self
    }

    /// Wald z-score, `beta / se`.
    pub fn z(&self) -> f64 {
        self.beta / self.se
    }

    ///
    /// Check the per-variant invariants: finite effect, positive finite
    /// standard error, p-value within `[0, 1]` and, when present, an allele
    /// frequency within `[0, 1]`.
    ///
    pub fn validate(&self) -> Result<(), VariantError> {
        self.check().map_err(|e| e.at(&self.chr, self.pos))
    }

    fn check(&self) -> Result<(), VariantError> {
        if !self.beta.is_finite() {
            return Err(VariantError::new(
                &self.id,
                DropReason::NonFiniteBeta,
                format!("beta = {}", self.beta),
            ));
        }
        if !(self.se.is_finite() && self.se > 0.0) {
            return Err(VariantError::new(
                &self.id,
                DropReason::NonPositiveSe,
                format!("se = {}", self.se),
            ));
        }
        if !(0.0..=1.0).contains(&self.pval) {
            return Err(VariantError::new(
                &self.id,
                DropReason::InvalidPValue,
                format!("p = {}", self.pval),
            ));
        }
        if let Some(eaf) = self.eaf {
            if !(0.0..=1.0).contains(&eaf) {
                return Err(VariantError::new(
                    &self.id,
                    DropReason::InvalidFrequency,
                    format!("eaf = {}", eaf),
                ));
            }
        }
        Ok(())
    }

    ///
    /// Order used for deterministic tie-breaks: karyotypic chromosome, then
    /// position, then alleles, then identifier.
    ///
    pub fn cmp_position(&self, other: &Variant) -> Ordering {
        chrom_karyotype_key(&self.chr)
            .cmp(&chrom_karyotype_key(&other.chr))
            .then(self.pos.cmp(&other.pos))
            .then_with(|| self.other_allele.cmp(&other.other_allele))
            .then_with(|| self.effect_allele.cmp(&other.effect_allele))
            .then_with(|| self.id.cmp(&other.id))
    }

    /// Key under which repeated rows count as the same variant.
    pub fn identity(&self) -> (String, u64, String, String, String) {
        (
            normalize_chrom(&self.chr),
            self.pos,
            self.other_allele.clone(),
            self.effect_allele.clone(),
            self.id.clone(),
        )
    }

    ///
    /// Most significant first; ties broken by [`Variant::cmp_position`].
    ///
    pub fn cmp_significance(&self, other: &Variant) -> Ordering {
        self.pval
            .total_cmp(&other.pval)
            .then_with(|| self.cmp_position(other))
    }
}

impl Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

pub fn default_variant_id(chr: &str, pos: u64, other_allele: &str, effect_allele: &str) -> String {
    format!("{}:{}:{}:{}", chr, pos, other_allele, effect_allele)
}
