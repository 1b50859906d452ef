use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "kinnet CLI - automated discovery of elementary reactions and assembly of reaction networks.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for the reaction search.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Explore the reactions of a single species.
    Explore(ExploreArgs),
    /// Explore a whole potential energy surface, one process per well.
    Pes(PesArgs),
    /// Assemble finished explorations into a reaction network and export it.
    Network(NetworkArgs),
}

/// Settings shared by every command that runs explorations.
#[derive(Args, Debug, Clone, Default)]
pub struct ExplorationArgs {
    /// Path to the configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory holding jobs, well list, snapshots and summaries.
    #[arg(short, long, value_name = "PATH")]
    pub workdir: Option<PathBuf>,

    /// Override the highest accepted barrier, in kcal/mol.
    #[arg(short, long, value_name = "FLOAT")]
    pub barrier_threshold: Option<f64>,

    /// Override the number of points of a constrained scan.
    #[arg(long, value_name = "INT")]
    pub scan_step: Option<usize>,

    /// Only search these reaction families (comma separated).
    #[arg(long, value_name = "NAMES", value_delimiter = ',')]
    pub families: Option<Vec<String>>,

    /// Skip these reaction families (comma separated).
    #[arg(long, value_name = "NAMES", value_delimiter = ',')]
    pub skip_families: Option<Vec<String>>,

    /// Publish the unimolecular products as new wells.
    #[arg(long)]
    pub network_mode: bool,

    /// Refine stationary points at the high level of theory.
    #[arg(long)]
    pub high_level: bool,

    /// Search ring conformers before the high-level refinement.
    #[arg(long)]
    pub conformer_search: bool,

    /// Remove the artifacts of failed reactions.
    #[arg(long)]
    pub delete_intermediate_files: bool,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S search.scan-step=20
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `explore` subcommand.
#[derive(Args, Debug)]
pub struct ExploreArgs {
    /// Path to the reactant structure (XYZ).
    #[arg(short, long, value_name = "PATH", required_unless_present = "chemid")]
    pub input: Option<PathBuf>,

    /// Explore a well already on the well list of the working directory.
    #[arg(long, value_name = "CHEMID", conflicts_with = "input")]
    pub chemid: Option<String>,

    #[command(flatten)]
    pub exploration: ExplorationArgs,
}

/// Arguments for the `pes` subcommand.
#[derive(Args, Debug)]
pub struct PesArgs {
    /// Path to the root structure (XYZ).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Maximum number of wells explored at the same time.
    #[arg(long, value_name = "INT")]
    pub simultaneous_jobs: Option<usize>,

    #[command(flatten)]
    pub exploration: ExplorationArgs,
}

/// Arguments for the `network` subcommand.
#[derive(Args, Debug)]
pub struct NetworkArgs {
    /// Directory of the finished explorations.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub workdir: PathBuf,

    #[command(flatten)]
    pub query: QueryArgs,

    /// Title written to the exported network.
    #[arg(long, default_value = "kinnet")]
    pub title: String,

    /// Replace chemids and reaction names by short labels.
    #[arg(long)]
    pub short_names: bool,

    /// Text export. Defaults to `network.txt` in the working directory.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Additionally write the selection as JSON.
    #[arg(long, value_name = "PATH")]
    pub json: Option<PathBuf>,

    /// Additionally write master-equation input for MESS.
    #[arg(long, value_name = "PATH")]
    pub mess: Option<PathBuf>,
}

/// Which part of the network to export. Without any option the whole
/// network is exported.
#[derive(Args, Debug, Clone, Default)]
#[group(required = false, multiple = true)]
pub struct QueryArgs {
    /// Start species of a path query.
    #[arg(long, value_name = "NAME", requires = "to")]
    pub from: Option<String>,

    /// End species of a path query.
    #[arg(long, value_name = "NAME", requires = "from")]
    pub to: Option<String>,

    /// Export every path between `--from` and `--to` instead of the lowest.
    #[arg(long, requires = "from")]
    pub all_paths: bool,

    /// Only the reactions of one well.
    #[arg(long, value_name = "NAME", conflicts_with_all = ["from", "temperature", "barrier_below"])]
    pub well: Option<String>,

    /// Reactions kinetically relevant at this temperature, in kelvin.
    #[arg(long, value_name = "KELVIN", conflicts_with_all = ["from", "barrier_below"])]
    pub temperature: Option<f64>,

    /// Reactions whose barrier lies below this value, in kcal/mol.
    #[arg(long, value_name = "FLOAT", conflicts_with = "from")]
    pub barrier_below: Option<f64>,
}
