//! Core data model for gwloc.
//!
//! This crate holds the types every other gwloc crate speaks: [`Variant`](models::Variant)
//! records read from GWAS summary statistics, the [`Locus`](models::Locus) intervals built
//! around lead variants, and the per-variant posterior rows that make up a
//! [`CredibleSet`](models::CredibleSet). It also carries the run configuration and a few
//! shared utilities (chromosome naming, readers, log-space arithmetic).
//!
//! # Example
//!
//! ```
//! use gwloc_core::models::{GenomicInterval, Variant};
//!
//! let v = Variant::new("chr1", 100, "A", "G", 0.12, 0.02, 1e-9);
//! assert!(v.validate().is_ok());
//!
//! let window = GenomicInterval::around("1", 100, 250_000);
//! assert_eq!(window.start, -249_900);
//! assert!(window.contains("chr1", 150));
//! ```

pub mod config;
pub mod errors;
pub mod models;
pub mod utils;

// re-exports
pub use config::GwlocConfig;
pub use errors::{ConfigError, DropReason, VariantError};
