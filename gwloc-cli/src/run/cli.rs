use clap::Command;

use crate::common::{with_definition_outputs, with_finemap_args, with_io_args, with_locus_args};

pub const RUN_CMD: &str = "run";

pub fn create_run_cli() -> Command {
    let cmd = Command::new(RUN_CMD)
        .about("Define loci and fine-map each of them in one go.");
    with_definition_outputs(with_finemap_args(with_locus_args(with_io_args(cmd))))
}
