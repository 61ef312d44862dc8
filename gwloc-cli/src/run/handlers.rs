use anyhow::{Context, Result};
use clap::ArgMatches;

use gwloc_finemap::run_pipeline;
use gwloc_io::TableWrite;

use crate::common::{
    ASSIGNMENTS_TABLE, CREDIBLE_SETS_TABLE, LOCI_TABLE, extraction, load_config, open_source,
    output_dir, table_path, write_definition_outputs, write_summary,
};

pub fn run_all(matches: &ArgMatches) -> Result<()> {
    let config = load_config(matches)?;
    let source = open_source(matches, &config)?;
    let out = output_dir(matches)?;
    let gzip = matches.get_flag("gzip");

    let result = run_pipeline(&source, &config, extraction(matches)).context("Pipeline failed")?;

    let loci_path = table_path(&out, LOCI_TABLE, gzip);
    result
        .fine_mapped
        .summaries
        .write_table_path(&loci_path)
        .with_context(|| format!("Failed to write {}", loci_path.display()))?;

    let assignments_path = table_path(&out, ASSIGNMENTS_TABLE, gzip);
    result
        .definition
        .assignments
        .write_table_path(&assignments_path)
        .with_context(|| format!("Failed to write {}", assignments_path.display()))?;

    let cs_path = table_path(&out, CREDIBLE_SETS_TABLE, gzip);
    result
        .fine_mapped
        .credible_sets
        .write_table_path(&cs_path)
        .with_context(|| format!("Failed to write {}", cs_path.display()))?;

    write_definition_outputs(matches, &source, &result.definition, &config, &out, gzip)?;

    write_summary(&out, &result.summary)
}
