//! researcher CLI: web research reports from a single question.
//!
//! Decomposes the question, searches, crawls and scrapes the results, and
//! synthesizes a cited Markdown report.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
