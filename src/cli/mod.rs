//! Command-line interface.

pub mod commands;
pub mod context;

pub use context::AppContext;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "questline",
    about = "Quest assignment and verification engine with conversational quest authoring",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize the project directory and database
    Init(commands::init::InitArgs),
    /// Inspect and manage quests
    Quest(commands::quest::QuestArgs),
    /// Assign a quest to a user
    Assign(commands::assign::AssignArgs),
    /// Submit proof for the current task of a user's active quest
    Verify(commands::verify::VerifyArgs),
    /// Show a user's assignment and XP status
    Status(commands::status::StatusArgs),
    /// Talk to the conversational quest builder
    Author(commands::author::AuthorArgs),
    /// Record activity facts (for ingestion glue and local testing)
    Activity(commands::activity::ActivityArgs),
}

/// Print an error and exit non-zero.
pub fn handle_error(err: anyhow::Error) -> ! {
    eprintln!("Error: {err:#}");
    std::process::exit(1);
}
