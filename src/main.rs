mod analysis;
mod commands;
mod config;
mod diagnostics;
mod error;
mod fixer;
mod grammar;
mod info;
mod oracle;
mod rule;
mod scanner;
mod symbols;
mod syntax;
mod types;
mod walker;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::Format;

#[derive(Parser)]
#[command(name = "idiom", about = "Find redundant namespace qualification in C# sources")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Log progress to stderr (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Report type names that are qualified more than needed
    Check {
        /// Files or directories to analyze (default: current directory)
        paths: Vec<PathBuf>,
        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: Format,
    },
    /// Remove redundant qualification where the short name is unambiguous
    Fix {
        /// Files or directories to rewrite (default: current directory)
        paths: Vec<PathBuf>,
    },
    /// Show rules, configuration, and exit codes
    Info {
        /// Output as JSON instead of markdown
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Check { paths, format } => commands::check(&paths, format),
        Commands::Fix { paths } => commands::fix(&paths),
        Commands::Info { json } => {
            info::run(json);
            Ok(ExitCode::SUCCESS)
        },
    };

    return match result {
        Ok(code) => code,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::from(2)
        },
    };
}

/// Install the stderr log subscriber. `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| return EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
