use clap::{Arg, ArgAction, Command};

pub const CONFIG_CMD: &str = "config";

pub fn create_config_cli() -> Command {
    Command::new(CONFIG_CMD)
        .about("Generate an example configuration file with every option at its default.")
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Output configuration file; .toml writes TOML, anything else YAML")
                .default_value("gwloc.yaml"),
        )
        .arg(
            Arg::new("force")
                .long("force")
                .action(ArgAction::SetTrue)
                .help("Overwrite an existing file"),
        )
}
