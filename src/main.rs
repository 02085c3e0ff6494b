use careerlens_engine::cli::{self, Cli, Command};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Search(args) => cli::search::run(args).await,
        Command::Check => cli::check::run().await,
        Command::Domains => cli::domains::run().await,
    }
}
