//! Patrimonio CLI: fixed-asset registry lookups and inventory report verification.
//!
//! Searches the registry spreadsheets by identifier or description, and
//! checks the assets listed in an inventory report against the registry.

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
