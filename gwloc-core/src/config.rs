//! Run configuration.
//!
//! Every tunable of the locus definer and the credible-set calculator lives in
//! [`GwlocConfig`]. Files may be YAML or TOML; any field left out takes its
//! default.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

pub const DEFAULT_SIGNIFICANCE_THRESHOLD: f64 = 5e-8;
pub const DEFAULT_RADIUS: u64 = 250_000;
pub const DEFAULT_PRIOR_SD: f64 = 0.2;
pub const DEFAULT_COVERAGE: f64 = 0.95;
pub const DEFAULT_GENOME_BUILD: &str = "GRCh38";

/// How the observed variance of an effect estimate is obtained for the Bayes factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PriorMode {
    /// `V = se²`, prior on the reported effect scale (log-odds or beta).
    #[default]
    Beta,
    /// `V = 1 / n_eff`, prior on the standardized effect; needs a sample size.
    Standardized,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorConfig {
    pub mode: PriorMode,
    /// Prior standard deviation of the true effect; the prior variance is `sd²`.
    pub sd: f64,
}

impl Default for PriorConfig {
    fn default() -> Self {
        PriorConfig {
            mode: PriorMode::Beta,
            sd: DEFAULT_PRIOR_SD,
        }
    }
}

impl PriorConfig {
    pub fn variance(&self) -> f64 {
        self.sd * self.sd
    }
}

///
/// Header names of the summary-statistics columns.
///
/// Required: chromosome, position, alleles, beta, se, p. The others are used
/// when present.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub variant_id: String,
    pub chrom: String,
    pub pos: String,
    pub effect_allele: String,
    pub other_allele: String,
    pub beta: String,
    pub se: String,
    pub pval: String,
    pub eaf: String,
    pub n: String,
    pub n_cases: String,
    pub n_controls: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        ColumnMap {
            variant_id: "SNP".to_string(),
            chrom: "CHR".to_string(),
            pos: "POS".to_string(),
            effect_allele: "EA".to_string(),
            other_allele: "OA".to_string(),
            beta: "BETA".to_string(),
            se: "SE".to_string(),
            pval: "P".to_string(),
            eaf: "EAF".to_string(),
            n: "N".to_string(),
            n_cases: "N_CASES".to_string(),
            n_controls: "N_CONTROLS".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GwlocConfig {
    /// Variants need `p < significance_threshold` to seed or join a locus.
    pub significance_threshold: f64,
    /// Locus half-width in base pairs.
    pub radius: u64,
    /// Target cumulative posterior of a credible set.
    pub coverage: f64,
    /// Only echoed into outputs; the core math is build-agnostic.
    pub genome_build: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locus_timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chromosomes: Option<Vec<String>>,
    pub prior: PriorConfig,
    pub columns: ColumnMap,
}

impl Default for GwlocConfig {
    fn default() -> Self {
        GwlocConfig {
            significance_threshold: DEFAULT_SIGNIFICANCE_THRESHOLD,
            radius: DEFAULT_RADIUS,
            coverage: DEFAULT_COVERAGE,
            genome_build: DEFAULT_GENOME_BUILD.to_string(),
            threads: None,
            locus_timeout_secs: None,
            chromosomes: None,
            prior: PriorConfig::default(),
            columns: ColumnMap::default(),
        }
    }
}

impl GwlocConfig {
    ///
    /// Load a config from a `.yaml`/`.yml` or `.toml` file and validate it.
    ///
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        let config: GwlocConfig = match ext.as_deref() {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&text)?,
            Some("toml") => toml::from_str(&text)?,
            _ => return Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = self.significance_threshold;
        if !(t > 0.0 && t <= 1.0) {
            return Err(ConfigError::InvalidValue {
                field: "significance_threshold",
                reason: format!("{} is not in (0, 1]", t),
            });
        }
        if self.radius == 0 {
            return Err(ConfigError::InvalidValue {
                field: "radius",
                reason: "must be positive".to_string(),
            });
        }
        // window bounds are computed in signed arithmetic
        if self.radius > i64::MAX as u64 {
            return Err(ConfigError::InvalidValue {
                field: "radius",
                reason: format!("{} exceeds {}", self.radius, i64::MAX),
            });
        }
        if !(self.prior.sd.is_finite() && self.prior.sd > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "prior.sd",
                reason: format!("{} is not a positive number", self.prior.sd),
            });
        }
        let c = self.coverage;
        if !(c > 0.0 && c <= 1.0) {
            return Err(ConfigError::InvalidValue {
                field: "coverage",
                reason: format!("{} is not in (0, 1]", c),
            });
        }
        if self.threads == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "threads",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Whether `chr` passes the optional chromosome restriction.
    pub fn includes_chrom(&self, chr: &str) -> bool {
        match &self.chromosomes {
            None => true,
            Some(allowed) => allowed.iter().any(|c| crate::utils::chrom_eq(c, chr)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;
    use std::io::Write;

    #[rstest]
    fn test_defaults() {
        let config = GwlocConfig::default();
        assert_eq!(config.significance_threshold, 5e-8);
        assert_eq!(config.radius, 250_000);
        assert!((config.prior.variance() - 0.04).abs() < 1e-12);
        assert_eq!(config.coverage, 0.95);
        assert!(config.validate().is_ok());
    }

    #[rstest]
    fn test_partial_yaml_takes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gwloc.yaml");
        let mut f = fs::File::create(&path).unwrap();
        writeln!(f, "radius: 500000").unwrap();
        writeln!(f, "prior:\n  mode: standardized").unwrap();
        writeln!(f, "columns:\n  beta: Effect\n  se: StdErr\n  pval: P-value").unwrap();

        let config = GwlocConfig::from_path(&path).unwrap();
        assert_eq!(config.radius, 500_000);
        assert_eq!(config.prior.mode, PriorMode::Standardized);
        assert_eq!(config.prior.sd, DEFAULT_PRIOR_SD);
        assert_eq!(config.columns.beta, "Effect");
        assert_eq!(config.columns.chrom, "CHR");
        assert_eq!(config.coverage, DEFAULT_COVERAGE);
    }

    #[rstest]
    fn test_toml_round_trip() {
        let mut config = GwlocConfig::default();
        config.coverage = 0.99;
        config.chromosomes = Some(vec!["chr1".to_string()]);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gwloc.toml");
        fs::write(&path, config.to_toml().unwrap()).unwrap();

        let loaded = GwlocConfig::from_path(&path).unwrap();
        assert_eq!(loaded, config);
        assert!(loaded.includes_chrom("1"));
        assert!(!loaded.includes_chrom("2"));
    }

    #[rstest]
    #[case("significance_threshold: 0.0", "significance_threshold")]
    #[case("coverage: 1.5", "coverage")]
    #[case("radius: 0", "radius")]
    #[case("radius: 9223372036854775808", "radius")]
    #[case("prior:\n  sd: -1.0", "prior.sd")]
    fn test_invalid_values(#[case] yaml: &str, #[case] field: &str) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yml");
        fs::write(&path, yaml).unwrap();

        match GwlocConfig::from_path(&path) {
            Err(ConfigError::InvalidValue { field: f, .. }) => assert_eq!(f, field),
            other => panic!("expected invalid value error, got {:?}", other),
        }
    }

    #[rstest]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{}").unwrap();
        assert!(matches!(
            GwlocConfig::from_path(&path),
            Err(ConfigError::UnsupportedFormat(_))
        ));
    }
}
