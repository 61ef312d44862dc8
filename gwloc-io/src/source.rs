//! Where variants come from.
//!
//! The pipeline never touches files directly: it asks a [`VariantSource`] for
//! every row, or for the rows inside one locus window. [`FileSource`] streams a
//! summary-statistics file on every request and is safe to query from many
//! threads at once; [`InMemorySource`] keeps rows sorted per chromosome and
//! answers range queries by binary search, which makes it the natural fake for
//! tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::debug;

use gwloc_core::config::ColumnMap;
use gwloc_core::models::{GenomicInterval, Variant};
use gwloc_core::utils::{chrom_karyotype_key, normalize_chrom};

use crate::error::{Result, SumstatsError};
use crate::sumstats::SumstatsReader;

/// A stream of rows; dropped rows arrive as [`SumstatsError::Dropped`].
pub type VariantStream<'a> = Box<dyn Iterator<Item = Result<Variant>> + 'a>;

pub trait VariantSource: Send + Sync {
    /// Every row of the source.
    fn stream_all(&self) -> Result<VariantStream<'_>>;

    /// Rows whose chromosome and position fall inside `interval` (bounds inclusive).
    fn stream_region(&self, interval: &GenomicInterval) -> Result<VariantStream<'_>>;

    /// Short label for log messages.
    fn describe(&self) -> String;
}

///
/// Summary statistics held in memory, sorted by position within each chromosome.
///
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    by_chr: HashMap<String, Vec<Variant>>,
}

impl InMemorySource {
    pub fn new(variants: Vec<Variant>) -> Self {
        let mut by_chr: HashMap<String, Vec<Variant>> = HashMap::new();
        for variant in variants {
            by_chr
                .entry(normalize_chrom(&variant.chr))
                .or_default()
                .push(variant);
        }
        for rows in by_chr.values_mut() {
            rows.sort_by(|a, b| a.cmp_position(b));
        }
        InMemorySource { by_chr }
    }

    pub fn len(&self) -> usize {
        self.by_chr.values().map(|v| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sorted_chroms(&self) -> Vec<&String> {
        let mut chroms: Vec<&String> = self.by_chr.keys().collect();
        chroms.sort_by_key(|c| chrom_karyotype_key(c));
        chroms
    }
}

fn validated(variant: &Variant) -> Result<Variant> {
    variant
        .validate()
        .map(|_| variant.clone())
        .map_err(SumstatsError::Dropped)
}

impl VariantSource for InMemorySource {
    fn stream_all(&self) -> Result<VariantStream<'_>> {
        let iter = self
            .sorted_chroms()
            .into_iter()
            .flat_map(move |chr| self.by_chr[chr].iter())
            .map(validated);
        Ok(Box::new(iter))
    }

    fn stream_region(&self, interval: &GenomicInterval) -> Result<VariantStream<'_>> {
        let rows: &[Variant] = match self.by_chr.get(&normalize_chrom(&interval.chr)) {
            Some(rows) => rows,
            None => &[],
        };
        let start = interval.clamped_start();
        let end = interval.end;
        let first = rows.partition_point(|v| v.pos < start);
        let iter = rows[first..]
            .iter()
            .take_while(move |v| (v.pos as i64) <= end)
            .map(validated);
        Ok(Box::new(iter))
    }

    fn describe(&self) -> String {
        format!("in-memory source ({} variants)", self.len())
    }
}

///
/// A summary-statistics file on disk, re-read on every request.
///
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    columns: ColumnMap,
}

impl FileSource {
    ///
    /// Open `path` once to check that the header carries every required column.
    ///
    pub fn new<P: AsRef<Path>>(path: P, columns: ColumnMap) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let reader = SumstatsReader::from_path(&path, &columns)?;
        debug!(
            "{}: {:?} separated, columns {:?}",
            path.display(),
            reader.delimiter(),
            reader.columns()
        );
        Ok(FileSource { path, columns })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl VariantSource for FileSource {
    fn stream_all(&self) -> Result<VariantStream<'_>> {
        Ok(Box::new(SumstatsReader::from_path(&self.path, &self.columns)?))
    }

    fn stream_region(&self, interval: &GenomicInterval) -> Result<VariantStream<'_>> {
        let reader = SumstatsReader::from_path(&self.path, &self.columns)?;
        Ok(Box::new(reader.with_region(interval.clone())))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
