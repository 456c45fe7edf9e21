//! pymap: scan a Python codebase and emit its symbol graph.
//!
//! The CLI is a thin shell around the pymap library:
//! - validate the scan/focus roots
//! - run the analysis pipeline
//! - write the JSON artifact and print a short summary

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use pymap::{analyze, Config, ScanRoots};

/// Exit codes for the CLI
///
/// - 0: Success
/// - 2: Error (bad roots, unwritable output, etc.)
mod exit_codes {
    pub const SUCCESS: u8 = 0;
    pub const ERROR: u8 = 2;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

/// Scan a Python codebase and emit the symbol graph for the visualizer
#[derive(Parser)]
#[command(name = "pymap")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory defining the full symbol-resolution universe
    /// (defaults to the parent of the current directory)
    #[arg(short, long)]
    scan_root: Option<PathBuf>,

    /// Directory whose files are rendered in the output; must be the scan
    /// root or a descendant of it (defaults to the current directory)
    #[arg(short, long)]
    focus_root: Option<PathBuf>,

    /// Where to write the analysis artifact
    #[arg(short, long, default_value = "output.json")]
    output: PathBuf,

    /// Summary format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Suppress the summary
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_codes::ERROR)
        }
    }
}

fn run(cli: Cli) -> Result<u8> {
    let cwd = std::env::current_dir().context("Failed to resolve current directory")?;
    let scan_root = match &cli.scan_root {
        Some(path) => path.clone(),
        None => cwd.parent().unwrap_or(&cwd).to_path_buf(),
    };
    let focus_root = cli.focus_root.clone().unwrap_or(cwd);

    // Root validation happens before any file is touched
    let roots = ScanRoots::new(&scan_root, &focus_root)?;
    let config = Config::load(roots.scan_root());

    let report = analyze(&roots, &config)?;

    if let Some(parent) = cli.output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create output directory {}", parent.display())
            })?;
        }
    }
    let json = serde_json::to_string_pretty(&report.artifact)
        .context("Failed to serialize analysis artifact")?;
    std::fs::write(&cli.output, json).with_context(|| {
        format!(
            "Failed to write analysis artifact to {}",
            cli.output.display()
        )
    })?;

    if !cli.quiet {
        match cli.format {
            OutputFormat::Json => {
                let summary = serde_json::json!({
                    "files": report.files_scanned,
                    "skipped": report.files_skipped,
                    "definitions": report.definition_count,
                    "output": cli.output.display().to_string(),
                });
                println!("{}", serde_json::to_string_pretty(&summary)?);
            }
            OutputFormat::Text => {
                println!(
                    "Analyzed {} files ({} skipped), {} definitions",
                    report.files_scanned, report.files_skipped, report.definition_count
                );
                println!("Artifact: {}", cli.output.display());
            }
        }
    }

    Ok(exit_codes::SUCCESS)
}
