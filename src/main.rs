use anyhow::{Context, Result};
use energylens::batch::{analyze_batch, discover_python_files};
use energylens::cli::{parse_args, Cli, Commands, OutputFormat};
use energylens::config::{load_config, load_config_file, AnalysisConfig};
use energylens::core::SourceUnit;
use energylens::output::{JsonWriter, OutputWriter, TerminalWriter};
use energylens::pipeline::{analyze, compare, refactor};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = parse_args();
    init_tracing(cli.verbosity);
    let mut config = resolve_config(&cli)?;

    match cli.command {
        Commands::Analyze {
            file,
            format,
            top,
            lines,
        } => {
            if top.is_some() {
                config.report.top = top;
            }
            let unit = read_unit(&file)?;
            let report = analyze(&unit, &config)
                .with_context(|| format!("Failed to analyze {}", file.display()))?;
            let stdout = io::stdout();
            match format {
                OutputFormat::Json => JsonWriter::new(stdout.lock()).write_analysis(&report),
                OutputFormat::Text => TerminalWriter::new(stdout.lock())
                    .with_line_map(lines)
                    .write_analysis(&report),
            }
        }
        Commands::Refactor {
            file,
            output,
            format,
            no_annotate,
        } => {
            if no_annotate {
                config.rewrite.annotate = false;
            }
            let unit = read_unit(&file)?;
            let outcome = refactor(&unit, &config)
                .with_context(|| format!("Failed to refactor {}", file.display()))?;

            match (&output, format) {
                (Some(path), _) => {
                    fs::write(path, &outcome.rewritten_text)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                }
                (None, OutputFormat::Text) => {
                    io::stdout().write_all(outcome.rewritten_text.as_bytes())?;
                }
                // The JSON document already carries the rewritten text.
                (None, OutputFormat::Json) => {}
            }
            match format {
                OutputFormat::Json => JsonWriter::new(io::stdout().lock()).write_refactor(&outcome),
                OutputFormat::Text => TerminalWriter::new(io::stderr().lock()).write_refactor(&outcome),
            }
        }
        Commands::Compare {
            original,
            optimized,
            format,
        } => {
            let before = read_unit(&original)?;
            let after = read_unit(&optimized)?;
            let comparison = compare(&before, &after, &config)?;
            let stdout = io::stdout();
            match format {
                OutputFormat::Json => JsonWriter::new(stdout.lock()).write_comparison(&comparison),
                OutputFormat::Text => TerminalWriter::new(stdout.lock()).write_comparison(&comparison),
            }
        }
        Commands::Batch { dir, format } => {
            let files = discover_python_files(&dir);
            if files.is_empty() {
                anyhow::bail!("No Python files found under {}", dir.display());
            }
            let results = analyze_batch(&files, &config);
            let stdout = io::stdout();
            match format {
                OutputFormat::Json => JsonWriter::new(stdout.lock()).write_batch(&results),
                OutputFormat::Text => TerminalWriter::new(stdout.lock()).write_batch(&results),
            }
        }
    }
}

/// `ENERGYLENS_LOG` wins over `RUST_LOG`; `-v` raises the default level.
fn init_tracing(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env("ENERGYLENS_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn resolve_config(cli: &Cli) -> Result<AnalysisConfig> {
    match &cli.config {
        Some(path) => load_config_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(load_config()),
    }
}

fn read_unit(path: &Path) -> Result<SourceUnit> {
    let source =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    SourceUnit::parse_with_path(source, path)
        .with_context(|| format!("Failed to parse {}", path.display()))
}
