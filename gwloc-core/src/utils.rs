use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;

///
/// Get a reader for either a gzip'd or non-gzip'd file.
///
/// # Arguments
///
/// - path: path to the file to read
///
pub fn get_dynamic_reader(path: &Path) -> Result<BufReader<Box<dyn Read>>> {
    let is_gzipped = path.extension() == Some(OsStr::new("gz"));
    let file = File::open(path).with_context(|| format!("Failed to open file: {:?}", path))?;
    let file: Box<dyn Read> = match is_gzipped {
        true => Box::new(MultiGzDecoder::new(file)),
        false => Box::new(file),
    };

    Ok(BufReader::new(file))
}

fn strip_chr_prefix(chr: &str) -> &str {
    let chr = chr.trim();
    match chr.get(..3) {
        Some(prefix) if prefix.eq_ignore_ascii_case("chr") => &chr[3..],
        _ => chr,
    }
}

///
/// Canonical chromosome name: no `chr` prefix, upper-case sex/mito names,
/// `MT` folded into `M`, and leading zeros dropped from numeric names.
///
/// `chr1`, `CHR1`, `1` and `01` all become `1`; `chrx` becomes `X`.
///
pub fn normalize_chrom(chr: &str) -> String {
    let bare = strip_chr_prefix(chr);
    if let Ok(n) = bare.parse::<u32>() {
        return n.to_string();
    }
    let upper = bare.to_ascii_uppercase();
    match upper.as_str() {
        "MT" => "M".to_string(),
        "X" | "Y" | "M" => upper,
        _ => bare.to_string(),
    }
}

/// Chromosome equality that ignores naming style.
pub fn chrom_eq(a: &str, b: &str) -> bool {
    a == b || normalize_chrom(a) == normalize_chrom(b)
}

/// Returns a sort key that orders chromosome names karyotypically:
/// numeric (1, 2, …, 22) → X → Y → M/MT → everything else alphabetically.
pub fn chrom_karyotype_key(chr: &str) -> (u8, u32, String) {
    let bare = strip_chr_prefix(chr);
    match bare.to_ascii_uppercase().as_str() {
        "X" => (1, 0, String::new()),
        "Y" => (2, 0, String::new()),
        "M" | "MT" => (3, 0, String::new()),
        _ => match bare.parse::<u32>() {
            Ok(n) => (0, n, String::new()),
            Err(_) => (4, 0, bare.to_string()),
        },
    }
}

///
/// Effective sample size of a case/control study: `4 / (1/cases + 1/controls)`.
///
/// Returns `None` unless both counts are positive and finite.
///
pub fn effective_sample_size(cases: f64, controls: f64) -> Option<f64> {
    if cases.is_finite() && controls.is_finite() && cases > 0.0 && controls > 0.0 {
        Some(4.0 / (1.0 / cases + 1.0 / controls))
    } else {
        None
    }
}

///
/// `ln(Σ exp(x_i))` computed without overflow by factoring out the maximum.
///
/// Returns `-inf` for an empty slice.
///
pub fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    let sum: f64 = values.iter().map(|v| (v - max).exp()).sum();
    max + sum.ln()
}
