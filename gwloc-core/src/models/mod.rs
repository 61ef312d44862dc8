pub mod credible_set;
pub mod interval;
pub mod locus;
pub mod variant;

// re-export for cleaner imports
pub use self::credible_set::{CredibleSet, PosteriorRow};
pub use self::interval::GenomicInterval;
pub use self::locus::{
    Locus, LocusAssignment, LocusId, LocusStatus, LocusSummary, VariantAnnotation,
};
pub use self::variant::Variant;
