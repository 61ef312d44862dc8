use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command, arg, value_parser};
use log::info;

use gwloc_core::GwlocConfig;
use gwloc_core::config::PriorMode;
use gwloc_finemap::{Extraction, LocusDefinition, RunSummary, annotate_variants};
use gwloc_io::{ANNOTATION_TABLE_HEADER, BedWrite, FileSource, TableStream, write_annotation};

pub const LOCI_TABLE: &str = "loci.tsv";
pub const ASSIGNMENTS_TABLE: &str = "assignments.tsv";
pub const ANNOTATIONS_TABLE: &str = "annotations.tsv";
pub const CREDIBLE_SETS_TABLE: &str = "credible_sets.tsv";
pub const LOCI_BED: &str = "loci.bed";
pub const SUMMARY_JSON: &str = "summary.json";

/// Input, config and output arguments every analysis subcommand takes.
pub fn with_io_args(cmd: Command) -> Command {
    cmd.arg(
        arg!(--sumstats <SUMSTATS>)
            .required(true)
            .help("Path to GWAS summary statistics (tab, comma or whitespace separated; may be gzipped)"),
    )
    .arg(
        arg!(--config <CONFIG>)
            .required(false)
            .help("YAML or TOML config file; flags below override its values"),
    )
    .arg(
        Arg::new("output-dir")
            .short('o')
            .long("output-dir")
            .value_name("DIR")
            .default_value(".")
            .help("Directory the output tables are written to"),
    )
    .arg(
        Arg::new("gzip")
            .long("gzip")
            .action(ArgAction::SetTrue)
            .help("Gzip the output tables"),
    )
}

/// Optional extra outputs of the subcommands that define loci.
pub fn with_definition_outputs(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("bed")
            .long("bed")
            .action(ArgAction::SetTrue)
            .help("Also write the locus windows as BED"),
    )
    .arg(
        Arg::new("annotate")
            .long("annotate")
            .action(ArgAction::SetTrue)
            .help("Also write every input variant with its significance, lead flag and locus (one more pass over the input)"),
    )
}

pub fn with_locus_args(cmd: Command) -> Command {
    cmd.arg(
        arg!(--threshold <THRESHOLD>)
            .required(false)
            .value_parser(value_parser!(f64))
            .help("Significance threshold; variants need p strictly below it (default: 5e-8)"),
    )
    .arg(
        arg!(--radius <RADIUS>)
            .required(false)
            .value_parser(value_parser!(u64))
            .help("Locus half-width in base pairs (default: 250000)"),
    )
    .arg(
        Arg::new("chromosomes")
            .long("chromosomes")
            .value_name("CHROMS")
            .value_delimiter(',')
            .num_args(1..)
            .help("Only process these chromosomes (comma separated)"),
    )
}

pub fn with_finemap_args(cmd: Command) -> Command {
    cmd.arg(
        arg!(--coverage <COVERAGE>)
            .required(false)
            .value_parser(value_parser!(f64))
            .help("Target cumulative posterior of each credible set (default: 0.95)"),
    )
    .arg(
        Arg::new("prior-sd")
            .long("prior-sd")
            .value_name("SD")
            .value_parser(value_parser!(f64))
            .help("Prior standard deviation of the true effect (default: 0.2)"),
    )
    .arg(
        Arg::new("prior-mode")
            .long("prior-mode")
            .value_name("MODE")
            .value_parser(["beta", "standardized"])
            .help("Observed variance from se^2 (beta) or 1/N (standardized)"),
    )
    .arg(
        Arg::new("threads")
            .short('t')
            .long("threads")
            .value_name("NUMBER")
            .value_parser(value_parser!(usize))
            .help("Worker threads for fine-mapping (default: all cores)"),
    )
    .arg(
        Arg::new("timeout")
            .long("timeout")
            .value_name("SECONDS")
            .value_parser(value_parser!(u64))
            .help("Give up on a locus after this many seconds"),
    )
    .arg(
        Arg::new("per-locus")
            .long("per-locus")
            .action(ArgAction::SetTrue)
            .help("Query each locus window separately instead of one pass over the input"),
    )
}

// subcommands only define some of the override flags
fn opt<T: Clone + Send + Sync + 'static>(matches: &ArgMatches, id: &str) -> Option<T> {
    matches.try_get_one::<T>(id).ok().flatten().cloned()
}

///
/// Build the run config: the `--config` file (or defaults), then flag overrides.
///
pub fn load_config(matches: &ArgMatches) -> Result<GwlocConfig> {
    let mut config = match opt::<String>(matches, "config") {
        Some(path) => GwlocConfig::from_path(&path)
            .with_context(|| format!("Failed to load config from {}", path))?,
        None => GwlocConfig::default(),
    };

    if let Some(t) = opt(matches, "threshold") {
        config.significance_threshold = t;
    }
    if let Some(r) = opt(matches, "radius") {
        config.radius = r;
    }
    if let Some(c) = opt(matches, "coverage") {
        config.coverage = c;
    }
    if let Some(sd) = opt(matches, "prior-sd") {
        config.prior.sd = sd;
    }
    if let Some(mode) = opt::<String>(matches, "prior-mode") {
        config.prior.mode = match mode.as_str() {
            "standardized" => PriorMode::Standardized,
            _ => PriorMode::Beta,
        };
    }
    if let Some(n) = opt(matches, "threads") {
        config.threads = Some(n);
    }
    if let Some(secs) = opt(matches, "timeout") {
        config.locus_timeout_secs = Some(secs);
    }
    if let Ok(Some(chroms)) = matches.try_get_many::<String>("chromosomes") {
        config.chromosomes = Some(chroms.cloned().collect());
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

pub fn open_source(matches: &ArgMatches, config: &GwlocConfig) -> Result<FileSource> {
    let path = matches
        .get_one::<String>("sumstats")
        .context("--sumstats is required")?;
    FileSource::new(path, config.columns.clone())
        .with_context(|| format!("Failed to open summary statistics {}", path))
}

pub fn extraction(matches: &ArgMatches) -> Extraction {
    if matches.try_get_one::<bool>("per-locus").ok().flatten() == Some(&true) {
        Extraction::PerLocus
    } else {
        Extraction::SinglePass
    }
}

pub fn output_dir(matches: &ArgMatches) -> Result<PathBuf> {
    let dir = PathBuf::from(
        matches
            .get_one::<String>("output-dir")
            .map(String::as_str)
            .unwrap_or("."),
    );
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    Ok(dir)
}

pub fn table_path(dir: &Path, name: &str, gzip: bool) -> PathBuf {
    if gzip {
        dir.join(format!("{}.gz", name))
    } else {
        dir.join(name)
    }
}

///
/// Write the optional outputs requested by `--bed` and `--annotate`.
///
pub fn write_definition_outputs(
    matches: &ArgMatches,
    source: &FileSource,
    definition: &LocusDefinition,
    config: &GwlocConfig,
    dir: &Path,
    gzip: bool,
) -> Result<()> {
    if matches.get_flag("bed") {
        let bed_path = dir.join(LOCI_BED);
        definition
            .loci
            .write_bed(&bed_path)
            .with_context(|| format!("Failed to write {}", bed_path.display()))?;
    }

    if matches.get_flag("annotate") {
        let path = table_path(dir, ANNOTATIONS_TABLE, gzip);
        let mut out = TableStream::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        writeln!(out, "{}", ANNOTATION_TABLE_HEADER)?;
        let n = annotate_variants(source, definition, config, |a| write_annotation(&mut out, a))
            .with_context(|| format!("Failed to write {}", path.display()))?;
        out.finish()
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("{} variant annotations written to {}", n, path.display());
    }
    Ok(())
}

pub fn write_summary(dir: &Path, summary: &RunSummary) -> Result<()> {
    let path = dir.join(SUMMARY_JSON);
    let json = serde_json::to_string_pretty(summary).context("Failed to serialize run summary")?;
    fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    summary.log();
    info!("Run summary written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    fn parse(args: &[&str]) -> ArgMatches {
        let cmd = with_finemap_args(with_locus_args(with_io_args(Command::new("t"))));
        cmd.try_get_matches_from(args).unwrap()
    }

    #[rstest]
    fn test_flags_override_defaults() {
        let m = parse(&[
            "t",
            "--sumstats",
            "x.tsv",
            "--radius",
            "500000",
            "--prior-mode",
            "standardized",
            "--chromosomes",
            "1,chr2",
            "--per-locus",
        ]);
        let config = load_config(&m).unwrap();
        assert_eq!(config.radius, 500_000);
        assert_eq!(config.prior.mode, PriorMode::Standardized);
        assert_eq!(config.chromosomes, Some(vec!["1".to_string(), "chr2".to_string()]));
        assert_eq!(config.coverage, 0.95);
        assert_eq!(extraction(&m), Extraction::PerLocus);
    }

    #[rstest]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gwloc.yaml");
        fs::write(&path, "radius: 100000\ncoverage: 0.99\n").unwrap();
        let m = parse(&[
            "t",
            "--sumstats",
            "x.tsv",
            "--config",
            path.to_str().unwrap(),
            "--coverage",
            "0.9",
        ]);
        let config = load_config(&m).unwrap();
        assert_eq!(config.radius, 100_000);
        assert_eq!(config.coverage, 0.9);
    }

    #[rstest]
    fn test_invalid_override_is_rejected() {
        let m = parse(&["t", "--sumstats", "x.tsv", "--threshold", "2"]);
        assert!(load_config(&m).is_err());
    }

    #[rstest]
    fn test_definition_outputs_are_off_by_default() {
        let cmd = with_definition_outputs(with_io_args(Command::new("t")));
        let m = cmd.try_get_matches_from(["t", "--sumstats", "x.tsv"]).unwrap();
        assert!(!m.get_flag("bed"));
        assert!(!m.get_flag("annotate"));
    }

    #[rstest]
    fn test_subcommand_without_finemap_flags() {
        let cmd = with_locus_args(with_io_args(Command::new("t")));
        let m = cmd.try_get_matches_from(["t", "--sumstats", "x.tsv"]).unwrap();
        let config = load_config(&m).unwrap();
        assert_eq!(config, GwlocConfig::default());
        assert_eq!(extraction(&m), Extraction::SinglePass);
    }
}
