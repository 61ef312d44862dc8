//! GWAS locus definition and approximate-Bayes-factor fine-mapping.
//!
//! This crate provides:
//!
//! - Clumping of genome-wide significant variants into non-overlapping loci
//! - A per-chromosome index of locus windows for streaming extraction
//! - Wakefield approximate Bayes factors computed in log space
//! - Posterior inclusion probabilities and minimal credible sets per locus
//! - A parallel pipeline tying these together, with a run summary of every
//!   dropped row and failed locus
//!
//! # Example
//!
//! ```
//! use gwloc_core::GwlocConfig;
//! use gwloc_core::models::Variant;
//! use gwloc_io::InMemorySource;
//! use gwloc_finemap::{Extraction, run_pipeline};
//!
//! let source = InMemorySource::new(vec![
//!     Variant::new("1", 1_000_000, "A", "G", 0.3, 0.03, 1e-20),
//!     Variant::new("1", 1_000_400, "A", "G", 0.1, 0.03, 1e-3),
//! ]);
//! let out = run_pipeline(&source, &GwlocConfig::default(), Extraction::SinglePass).unwrap();
//!
//! assert_eq!(out.definition.loci.len(), 1);
//! assert_eq!(out.fine_mapped.credible_sets[0].rows.len(), 2);
//! ```

pub mod abf;
pub mod annotate;
pub mod credible;
pub mod errors;
pub mod index;
pub mod loci;
pub mod pipeline;
pub mod report;
pub mod window;

// re-exports
pub use annotate::{VariantAnnotator, annotate_all, annotate_variants};
pub use credible::compute_credible_set;
pub use errors::{FinemapError, LocusError};
pub use index::LocusIndex;
pub use loci::{LocusDefinition, define_loci, define_loci_from_variants};
pub use pipeline::{Extraction, FineMapOutput, PipelineOutput, fine_map_loci, run_pipeline};
pub use report::{DropCounts, LocusWarning, RunSummary};
pub use window::{Deadline, LocusWindow, extract_window, extract_windows};
