//! Implementation of the `questline init` command.

use crate::domain::models::Config;
use crate::infrastructure::DatabaseConnection;
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tokio::fs;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Force reinitialization even if already initialized
    #[arg(long, short)]
    pub force: bool,

    /// Target directory (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

pub async fn execute(args: InitArgs) -> Result<()> {
    let target = if args.path.is_absolute() {
        args.path.clone()
    } else {
        std::env::current_dir()
            .context("Failed to get current directory")?
            .join(&args.path)
    };
    let questline_dir = target.join(".questline");

    if questline_dir.exists() && !args.force {
        println!("Project already initialized. Use --force to reinitialize.");
        return Ok(());
    }
    if args.force && questline_dir.exists() {
        fs::remove_dir_all(&questline_dir)
            .await
            .context("Failed to remove existing .questline directory")?;
    }

    fs::create_dir_all(&questline_dir)
        .await
        .with_context(|| format!("Failed to create {}", questline_dir.display()))?;

    let config = Config::default();
    let config_path = questline_dir.join("config.yaml");
    fs::write(&config_path, serde_yaml::to_string(&config)?)
        .await
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    let db_path = questline_dir.join("questline.db");
    let db = DatabaseConnection::new(
        &format!("sqlite:{}", db_path.display()),
        config.database.max_connections,
    )
    .await?;
    db.migrate().await?;
    db.close().await;

    println!("Initialized questline project at {}", target.display());
    println!("  config:   {}", config_path.display());
    println!("  database: {}", db_path.display());
    Ok(())
}
