mod common;
mod config;
mod finemap;
mod loci;
mod run;

use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};
use log::LevelFilter;

pub mod consts {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
    pub const BIN_NAME: &str = "gwloc";
}

fn build_parser() -> Command {
    Command::new(consts::BIN_NAME)
        .bin_name(consts::BIN_NAME)
        .version(consts::VERSION)
        .about("Define independent loci from GWAS summary statistics and fine-map them with approximate Bayes factors.")
        .subcommand_required(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .global(true)
                .help("More log output (-v debug, -vv trace)"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Only log warnings and errors"),
        )
        .subcommand(loci::cli::create_loci_cli())
        .subcommand(finemap::cli::create_finemap_cli())
        .subcommand(run::cli::create_run_cli())
        .subcommand(config::cli::create_config_cli())
}

fn init_logging(matches: &ArgMatches) {
    let level = if matches.get_flag("quiet") {
        LevelFilter::Warn
    } else {
        match matches.get_count("verbose") {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };
    // RUST_LOG still wins when set
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn dispatch(matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        //
        // LOCUS DEFINITION
        //
        Some((loci::cli::LOCI_CMD, matches)) => loci::handlers::run_loci(matches),

        //
        // FINE-MAPPING OF EXISTING LOCI
        //
        Some((finemap::cli::FINEMAP_CMD, matches)) => finemap::handlers::run_finemap(matches),

        //
        // BOTH
        //
        Some((run::cli::RUN_CMD, matches)) => run::handlers::run_all(matches),

        //
        // EXAMPLE CONFIG
        //
        Some((config::cli::CONFIG_CMD, matches)) => config::handlers::run_config(matches),

        _ => unreachable!("Subcommand not found"),
    }
}

fn main() -> Result<()> {
    let app = build_parser();
    let matches = app.get_matches();

    init_logging(&matches);
    dispatch(&matches)
}
