mod commands;
mod logging;
mod reader;

use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use reader::Project;

#[derive(Parser)]
#[command(
    name = "aura",
    version,
    about = "Aura definition resolver: build, validate and analyze component definitions"
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Project directory containing aura.config.yaml
    #[arg(long, global = true, default_value = ".")]
    pub root: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a definition and print it as JSON
    Build {
        /// Descriptor such as `ui:button` or `markup://ui:button`
        descriptor: String,
    },

    /// Show the dependency set of a definition
    Deps {
        descriptor: String,

        #[arg(long, value_enum, default_value_t = ReportFormat::Human)]
        format: ReportFormat,
    },

    /// Build every component in the project and report diagnostics
    Validate {
        #[arg(long, value_enum, default_value_t = ReportFormat::Human)]
        format: ReportFormat,
    },

    /// Output the extends/reference graph of the project
    Analyze {
        #[arg(long, value_enum, default_value_t = GraphFormat::Mermaid)]
        format: GraphFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Human,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GraphFormat {
    Mermaid,
    Dot,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init_logging(&cli.global) {
        eprintln!("Warning: {e}");
    }

    match run(&cli) {
        Ok((output, error_count)) => {
            println!("{output}");
            if error_count > 0 {
                process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(1);
        }
    }
}

/// Run the selected command; returns the output and the number of errors it
/// reported.
fn run(cli: &Cli) -> anyhow::Result<(String, usize)> {
    let project = Project::open(&cli.global.root)?;
    match &cli.command {
        Commands::Build { descriptor } => {
            commands::build::run_build(&project, descriptor).map(|out| (out, 0))
        }
        Commands::Deps { descriptor, format } => {
            commands::deps::run_deps(&project, descriptor, *format).map(|out| (out, 0))
        }
        Commands::Validate { format } => commands::validate::run_validate(&project, *format),
        Commands::Analyze { format } => {
            commands::analyze::run_analyze(&project, *format).map(|out| (out, 0))
        }
    }
}
