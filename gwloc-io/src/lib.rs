//! # Input/Output for gwloc.
//!
//! Reading GWAS summary statistics with configurable column names (plain or gzipped,
//! tab, comma or whitespace separated), the [`VariantSource`] abstraction the
//! fine-mapping pipeline pulls locus windows through, and writers for the locus,
//! assignment and credible-set tables.
//!
pub mod error;
pub mod source;
pub mod sumstats;
pub mod write;

// re-expose core functions
pub use error::*;
pub use source::*;
pub use sumstats::*;
pub use write::*;
