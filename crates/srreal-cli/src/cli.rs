use clap::{Args, Parser, Subcommand};
use srreal::engine::registries::ComponentKind;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "srreal CLI - Inspect pluggable PDF calculator components and assemble calculation setups.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List registered component types and their aliases.
    Types(TypesArgs),
    /// Show the attributes of a registered component type.
    Inspect(InspectArgs),
    /// Assemble a calculation setup from a configuration file and print its snapshot.
    Setup(SetupArgs),
}

/// Arguments for the `types` subcommand.
#[derive(Args, Debug)]
pub struct TypesArgs {
    /// Only list this kind (peak-profile, peak-width, scattering-factor-table).
    #[arg(short, long, value_name = "KIND")]
    pub kind: Option<ComponentKind>,
}

/// Arguments for the `inspect` subcommand.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Component kind (peak-profile, peak-width, scattering-factor-table).
    #[arg(value_name = "KIND")]
    pub kind: ComponentKind,

    /// Registered type name or alias.
    #[arg(value_name = "TYPE")]
    pub type_name: String,
}

/// Arguments for the `setup` subcommand.
#[derive(Args, Debug)]
pub struct SetupArgs {
    /// Path to the setup configuration file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Override the custom scattering factor CSV file.
    #[arg(long, value_name = "PATH")]
    pub custom_factors: Option<PathBuf>,

    /// Write the snapshot to a file instead of standard output.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S grid.rmax=20 -S peak-width.type=constant
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}
