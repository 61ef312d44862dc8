use thiserror::Error;

use gwloc_core::ConfigError;
use gwloc_core::models::{LocusId, LocusStatus};
use gwloc_io::SumstatsError;

/// Failure of one locus. These are recorded and the run continues.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LocusError {
    #[error("no data for locus {0}: window extraction returned zero rows")]
    NoData(LocusId),

    #[error("no valid variants for locus {locus}: all {dropped} window rows were dropped")]
    NoValidVariants { locus: LocusId, dropped: usize },

    #[error("locus {locus} timed out after {secs}s")]
    Timeout { locus: LocusId, secs: u64 },
}

impl LocusError {
    pub fn locus(&self) -> LocusId {
        match self {
            LocusError::NoData(id) => *id,
            LocusError::NoValidVariants { locus, .. } => *locus,
            LocusError::Timeout { locus, .. } => *locus,
        }
    }

    pub fn status(&self) -> LocusStatus {
        match self {
            LocusError::NoData(_) => LocusStatus::NoData,
            LocusError::NoValidVariants { .. } => LocusStatus::NoValidVariants,
            LocusError::Timeout { .. } => LocusStatus::TimedOut,
        }
    }
}

/// Run-level failures abort the run; [`FinemapError::Locus`] only ends one locus.
#[derive(Error, Debug)]
pub enum FinemapError {
    #[error(transparent)]
    Locus(#[from] LocusError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Input(#[from] SumstatsError),

    #[error("Failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FinemapError>;
