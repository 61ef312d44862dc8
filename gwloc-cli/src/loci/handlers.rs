use anyhow::{Context, Result};
use clap::ArgMatches;
use log::info;

use gwloc_finemap::{RunSummary, define_loci};
use gwloc_io::TableWrite;

use crate::common::{
    ASSIGNMENTS_TABLE, LOCI_TABLE, load_config, open_source, output_dir, table_path,
    write_definition_outputs, write_summary,
};

pub fn run_loci(matches: &ArgMatches) -> Result<()> {
    let config = load_config(matches)?;
    let source = open_source(matches, &config)?;
    let out = output_dir(matches)?;
    let gzip = matches.get_flag("gzip");

    let definition = define_loci(&source, &config).context("Locus definition failed")?;

    let loci_path = table_path(&out, LOCI_TABLE, gzip);
    definition
        .summaries()
        .write_table_path(&loci_path)
        .with_context(|| format!("Failed to write {}", loci_path.display()))?;

    let assignments_path = table_path(&out, ASSIGNMENTS_TABLE, gzip);
    definition
        .assignments
        .write_table_path(&assignments_path)
        .with_context(|| format!("Failed to write {}", assignments_path.display()))?;

    write_definition_outputs(matches, &source, &definition, &config, &out, gzip)?;

    info!("{} loci written to {}", definition.loci.len(), loci_path.display());

    let mut summary = RunSummary::new(&config);
    summary.n_rows = definition.n_rows;
    summary.n_significant = definition.n_significant();
    summary.n_loci = definition.loci.len();
    summary.dropped = definition.dropped;
    write_summary(&out, &summary)
}
