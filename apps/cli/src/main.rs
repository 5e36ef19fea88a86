//! ReportWeaver CLI — summarize a handful of sources into one report.
//!
//! Fetches user-supplied URLs or pasted text blocks, summarizes each with a
//! language model, synthesizes a combined report, and supports
//! feedback-driven refinement rounds.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
