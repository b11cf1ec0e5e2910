mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use commands::{CompareArgs, OutputFormat};

#[derive(Parser)]
#[command(name = "schemadiff")]
#[command(about = "Plan the changes that turn one schema model into another", long_about = None)]
struct Cli {
    /// Log every planning step to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a schema model file
    Check {
        model: PathBuf,
        #[arg(long)]
        case_insensitive: bool,
    },
    /// Print the ordered change list
    Plan {
        #[command(flatten)]
        compare: CompareArgs,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Write the current model with every planned change applied
    Apply {
        #[command(flatten)]
        compare: CompareArgs,
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Check { model, case_insensitive } => commands::check::run(&model, case_insensitive),
        Commands::Plan { compare, format } => commands::plan::run(&compare, format),
        Commands::Apply { compare, output } => commands::apply::run(&compare, &output),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
