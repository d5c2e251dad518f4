//! CLI tool for waczfold archive operations.

mod commands;
mod exit_codes;
mod output;
mod progress;

use clap::{ArgAction, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use exit_codes::ExitCode;

/// Unfold WARC and WACZ archives into folders, and fold them back
#[derive(Parser)]
#[command(name = "waczfold")]
#[command(author, version, about = "Unfold WARC and WACZ archives into folders, and fold them back", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, short = 'f', value_enum, default_value = "human", global = true)]
    format: OutputFormat,

    /// Suppress progress output
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// More log output (-v info, -vv debug)
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a .warc, .warc.gz or .wacz file into a directory (alias: x)
    #[command(alias = "x")]
    Extract {
        /// Archive file to extract
        input: PathBuf,

        /// Output directory (defaults to the input without its extension)
        output: Option<PathBuf>,

        /// Delete a non-empty output directory before extracting
        #[arg(long)]
        delete_existing: bool,

        /// Answer yes to the delete prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Create a .warc, .warc.gz or .wacz file from a directory (alias: c)
    #[command(alias = "c")]
    Create {
        /// Directory to fold
        input: PathBuf,

        /// Archive file to create
        output: PathBuf,

        /// Wrap ordinary files as file:// resources
        #[arg(long)]
        as_files: bool,

        /// gzip level (0-9)
        #[arg(short = 'l', long, default_value = "6")]
        level: u32,

        /// Page lists to store in a .wacz
        #[arg(long)]
        pages: Option<PathBuf>,

        /// Logs to store in a .wacz
        #[arg(long)]
        logs: Option<PathBuf>,
    },

    /// Show what kind of archive a path is (alias: i)
    #[command(alias = "i")]
    Inspect {
        /// Archive file or unpacked directory
        path: PathBuf,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

fn init_logging(verbose: u8, quiet: bool) {
    let default = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted");
        std::process::exit(exit_codes::USER_INTERRUPT);
    })
    .ok();

    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let exit_code = match cli.command {
        Commands::Extract {
            input,
            output,
            delete_existing,
            yes,
        } => commands::extract(&commands::ExtractConfig {
            input: &input,
            output_dir: output,
            delete_existing: delete_existing || yes,
            format: cli.format,
            quiet: cli.quiet,
        }),

        Commands::Create {
            input,
            output,
            as_files,
            level,
            pages,
            logs,
        } => commands::create(&commands::CreateConfig {
            input_dir: &input,
            output: &output,
            as_files,
            level,
            pages,
            logs,
            format: cli.format,
            quiet: cli.quiet,
        }),

        Commands::Inspect { path } => commands::inspect(&path, cli.format),

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut std::io::stdout());
            ExitCode::Success
        }
    };

    std::process::exit(exit_code.code());
}
