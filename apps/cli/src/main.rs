//! newsdesk: daily business-intelligence reports from news search.
//!
//! Researches each configured topic, has a language model analyze the
//! articles, and delivers the rendered report by email, webhook, or console.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    // A missing .env is fine; real environment variables still apply.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
