//! DocHarvest CLI — turn a documentation site into a machine-consumable
//! corpus: crawl, extract, chunk, and index for similarity search.

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
