use anyhow::Context as _;
use clap::Parser as _;
use helix_mcp::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    helix_mcp::logging::init(&cli.log_level, cli.log_format);
    helix_mcp::run(cli).await.context("helix-mcp failed")
}
