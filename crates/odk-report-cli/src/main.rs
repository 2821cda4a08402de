//! odk-report CLI
//!
//! Render one ODK submission (XML instance) as an HTML report, using the
//! XLSForm workbook it was collected with for labels and choice names.
//!
//! Logging goes to stderr and is controlled by `RUST_LOG` (default `warn`).

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "odk-report")]
#[command(author, about = "Process ODK submission into an HTML report")]
struct Cli {
    /// Path to the XML submission.
    xml_path: PathBuf,
    /// Path to the XLSForm workbook (.xlsx) with `survey` and `choices` sheets.
    xlsx_path: PathBuf,
    /// Path for the output HTML file (overwritten).
    output_html_path: PathBuf,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let summary = odk_report_core::convert(&cli.xml_path, &cli.xlsx_path, &cli.output_html_path)
        .with_context(|| {
            format!(
                "failed to convert `{}` with form `{}`",
                cli.xml_path.display(),
                cli.xlsx_path.display()
            )
        })?;
    if !summary.misses.is_empty() {
        tracing::debug!(
            misses = summary.misses.len(),
            "some fields fell back to raw values"
        );
    }

    eprintln!(
        "{} {} ({} fields)",
        "wrote".green().bold(),
        cli.output_html_path.display().to_string().bold(),
        summary.fields_rendered
    );
    Ok(())
}
