use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "energylens")]
#[command(about = "Complexity and energy-inefficiency analyzer for Python sources", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Configuration file (defaults to the nearest .energylens.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbosity: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify complexity, score it, and list inefficiency patterns
    Analyze {
        /// Python file to analyze
        file: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Show only the top N suggestions
        #[arg(long = "top", visible_alias = "head")]
        top: Option<usize>,

        /// Print the per-line energy map
        #[arg(long)]
        lines: bool,
    },

    /// Apply automatic rewrites and report the result
    Refactor {
        /// Python file to rewrite
        file: PathBuf,

        /// Where to write the rewritten source (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format for the summary
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Skip the `# energylens:` annotation comments
        #[arg(long)]
        no_annotate: bool,
    },

    /// Compare an original file against an optimized version
    Compare {
        original: PathBuf,
        optimized: PathBuf,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Analyze every Python file under a directory
    Batch {
        /// Directory to scan
        dir: PathBuf,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}

pub fn parse_args() -> Cli {
    Cli::parse()
}
