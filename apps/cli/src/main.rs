//! Shopscribe CLI: turns store products into SEO blog posts.
//!
//! Selects a topical set of products, has a language model write an
//! article around them, and publishes it to the store's blog.

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
