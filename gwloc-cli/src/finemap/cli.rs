use clap::{Command, arg};

use crate::common::{with_finemap_args, with_io_args};

pub const FINEMAP_CMD: &str = "finemap";

pub fn create_finemap_cli() -> Command {
    let cmd = Command::new(FINEMAP_CMD)
        .about("Compute posterior inclusion probabilities and credible sets for existing loci.")
        .arg(
            arg!(--loci <LOCI>)
                .required(true)
                .help("Locus table written by `gwloc loci` (may be gzipped)"),
        );
    with_finemap_args(with_io_args(cmd))
}
