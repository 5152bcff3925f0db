//! Questline CLI entry point.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use questline::cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init(args) => questline::cli::commands::init::execute(args).await,
        Commands::Quest(args) => questline::cli::commands::quest::execute(args).await,
        Commands::Assign(args) => questline::cli::commands::assign::execute(args).await,
        Commands::Verify(args) => questline::cli::commands::verify::execute(args).await,
        Commands::Status(args) => questline::cli::commands::status::execute(args).await,
        Commands::Author(args) => questline::cli::commands::author::execute(args).await,
        Commands::Activity(args) => questline::cli::commands::activity::execute(args).await,
    };

    if let Err(err) = result {
        questline::cli::handle_error(err);
    }
}
