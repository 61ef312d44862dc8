use clap::Command;

use crate::common::{with_definition_outputs, with_io_args, with_locus_args};

pub const LOCI_CMD: &str = "loci";

pub fn create_loci_cli() -> Command {
    let cmd = Command::new(LOCI_CMD)
        .about("Clump genome-wide significant variants into independent loci.");
    with_definition_outputs(with_locus_args(with_io_args(cmd)))
}
