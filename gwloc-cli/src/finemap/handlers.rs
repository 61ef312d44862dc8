use anyhow::{Context, Result};
use clap::ArgMatches;

use gwloc_core::models::Locus;
use gwloc_finemap::{RunSummary, fine_map_loci};
use gwloc_io::{TableWrite, read_locus_table};

use crate::common::{
    CREDIBLE_SETS_TABLE, LOCI_TABLE, extraction, load_config, open_source, output_dir, table_path,
    write_summary,
};

pub fn run_finemap(matches: &ArgMatches) -> Result<()> {
    let config = load_config(matches)?;
    let source = open_source(matches, &config)?;
    let out = output_dir(matches)?;
    let gzip = matches.get_flag("gzip");

    let loci_table = matches
        .get_one::<String>("loci")
        .context("--loci is required")?;
    let defined = read_locus_table(loci_table)
        .with_context(|| format!("Failed to read locus table {}", loci_table))?;
    let loci: Vec<Locus> = defined.iter().map(|s| s.locus.clone()).collect();
    let n_significant: Vec<usize> = defined.iter().map(|s| s.n_significant).collect();

    let result = fine_map_loci(&source, &loci, &n_significant, &config, extraction(matches))
        .context("Fine-mapping failed")?;

    let cs_path = table_path(&out, CREDIBLE_SETS_TABLE, gzip);
    result
        .credible_sets
        .write_table_path(&cs_path)
        .with_context(|| format!("Failed to write {}", cs_path.display()))?;

    let loci_path = table_path(&out, LOCI_TABLE, gzip);
    result
        .summaries
        .write_table_path(&loci_path)
        .with_context(|| format!("Failed to write {}", loci_path.display()))?;

    let mut summary = RunSummary::new(&config);
    summary.n_significant = n_significant.iter().sum();
    summary.n_loci = loci.len();
    summary.n_fine_mapped = result.credible_sets.len();
    summary.window_dropped = result.window_dropped;
    summary.warnings = result.warnings;
    write_summary(&out, &summary)
}
