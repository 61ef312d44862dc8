use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a single variant was excluded from locus definition or fine-mapping.
///
/// Every drop is counted by kind and surfaced in the run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    MalformedRow,
    NonFiniteBeta,
    NonPositiveSe,
    InvalidPValue,
    InvalidFrequency,
    MissingSampleSize,
    /// A repeat of a variant already seen: same site, alleles and identifier.
    DuplicateVariant,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropReason::MalformedRow => "malformed_row",
            DropReason::NonFiniteBeta => "non_finite_beta",
            DropReason::NonPositiveSe => "non_positive_se",
            DropReason::InvalidPValue => "invalid_p_value",
            DropReason::InvalidFrequency => "invalid_frequency",
            DropReason::MissingSampleSize => "missing_sample_size",
            DropReason::DuplicateVariant => "duplicate_variant",
        }
    }
}

impl Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("variant {variant} dropped ({reason}): {detail}")]
pub struct VariantError {
    pub variant: String,
    pub reason: DropReason,
    pub detail: String,
    /// Chromosome and position, when the row got far enough to have them.
    pub site: Option<(String, u64)>,
}

impl VariantError {
    pub fn new(variant: impl Into<String>, reason: DropReason, detail: impl Into<String>) -> Self {
        VariantError {
            variant: variant.into(),
            reason,
            detail: detail.into(),
            site: None,
        }
    }

    pub fn at(mut self, chr: &str, pos: u64) -> Self {
        self.site = Some((chr.to_string(), pos));
        self
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Can't read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Can't serialize config to TOML: {0}")]
    TomlWrite(#[from] toml::ser::Error),

    #[error("Unsupported config format (expected .yaml, .yml or .toml): {0}")]
    UnsupportedFormat(String),

    #[error("Invalid value for `{field}`: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}
