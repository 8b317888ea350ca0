use clap::Parser;
use reply_pipeline::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Generate(args) => cli::generate::run(args).await,
        Command::Sweep(args) => cli::sweep::run(args).await,
        Command::Validate(args) => cli::validate::run(args).await,
    }
}
