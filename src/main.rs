use clap::Parser;

use livetally::cli::{CheckCommand, Cli, Commands};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Watch(args) => livetally::cli::watch::execute_watch(args.config).await,
        Commands::Count(args) => livetally::cli::count::execute_count(args.config).await,
        Commands::Check(CheckCommand::Config(args)) => {
            livetally::cli::check::execute_config(args.config).await
        }
        Commands::Check(CheckCommand::Connection(args)) => {
            livetally::cli::check::execute_connection(args.config).await
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
