use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use cryptotax_summary::{summarize_file, ReadOptions};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Delimiter {
    Comma,
    Tab,
    Semicolon,
}

impl Delimiter {
    fn byte(self) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Tab => b'\t',
            Delimiter::Semicolon => b';',
        }
    }
}

/// Summarize crypto transactions from a CSV or XLSX export for tax reporting.
#[derive(Debug, Parser)]
#[command(version)]
struct Cli {
    /// Path to the file containing crypto disposal transactions.
    path: PathBuf,

    /// Split on this delimiter instead of detecting it.
    #[arg(long, value_enum)]
    delimiter: Option<Delimiter>,

    /// Worksheet to read from an XLSX workbook.
    #[arg(long)]
    sheet: Option<String>,

    /// Print the summary as JSON.
    #[arg(long)]
    json: bool,

    /// Log detection and classification details to stderr.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let options = ReadOptions {
        delimiter: cli.delimiter.map(Delimiter::byte),
        sheet: cli.sheet,
    };
    let summary = summarize_file(&cli.path, &options)
        .with_context(|| format!("failed to summarize {}", cli.path.display()))?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{summary}");
    }
    Ok(())
}
