//! Implementation of the `questline quest` subcommands.

use crate::cli::AppContext;
use crate::domain::ports::QuestRepository;
use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use uuid::Uuid;

#[derive(Args, Debug)]
pub struct QuestArgs {
    #[command(subcommand)]
    pub command: QuestCommands,
}

#[derive(Subcommand, Debug)]
pub enum QuestCommands {
    /// List active quests in a guild
    List {
        #[arg(long)]
        guild: String,
    },
    /// Show one quest and its tasks
    Show { id: Uuid },
    /// Activate a quest
    Activate { id: Uuid },
    /// Deactivate a quest (it stops being assignable)
    Deactivate { id: Uuid },
}

pub async fn execute(args: QuestArgs) -> Result<()> {
    let ctx = AppContext::init().await?;
    match args.command {
        QuestCommands::List { guild } => list(&ctx, &guild).await,
        QuestCommands::Show { id } => show(&ctx, id).await,
        QuestCommands::Activate { id } => set_active(&ctx, id, true).await,
        QuestCommands::Deactivate { id } => set_active(&ctx, id, false).await,
    }
}

async fn list(ctx: &AppContext, guild_id: &str) -> Result<()> {
    let quests = ctx.quests.get_active_quests(guild_id).await?;
    if quests.is_empty() {
        println!("No active quests in guild {guild_id}");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Id",
        "Name",
        "Points",
        "Completions",
        "Created",
    ]);
    for quest in &quests {
        table.add_row(vec![
            Cell::new(quest.id),
            Cell::new(&quest.name),
            Cell::new(quest.points),
            Cell::new(quest.completion_count),
            Cell::new(quest.created_at.format("%Y-%m-%d")),
        ]);
    }
    println!("{table}");
    Ok(())
}

async fn show(ctx: &AppContext, id: Uuid) -> Result<()> {
    let Some(quest) = ctx.quests.get_quest(id).await? else {
        bail!("No quest with id {id}");
    };
    let tasks = ctx.quests.get_tasks(id).await?;

    println!("{} ({})", quest.name, quest.id);
    println!("  {}", quest.description);
    println!(
        "  guild: {}  points: {}  active: {}  completions: {}",
        quest.guild_id, quest.points, quest.active, quest.completion_count
    );
    if tasks.is_empty() {
        println!("  (no tasks; completes as a single implicit step)");
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["#", "Task", "Points", "Verification"]);
    for task in &tasks {
        let kind = match &task.verification {
            crate::domain::models::VerificationConfig::Native(check) => {
                format!("native ({})", check.activity.event_name())
            }
            crate::domain::models::VerificationConfig::Connector(check) => {
                format!("connector #{}", check.connector_id)
            }
            crate::domain::models::VerificationConfig::Legacy(check) => {
                format!("legacy ({})", check.endpoint)
            }
        };
        table.add_row(vec![
            Cell::new(task.position),
            Cell::new(&task.title),
            Cell::new(task.points),
            Cell::new(kind),
        ]);
    }
    println!("{table}");
    Ok(())
}

async fn set_active(ctx: &AppContext, id: Uuid, active: bool) -> Result<()> {
    ctx.quests.set_quest_active(id, active).await?;
    println!(
        "Quest {id} is now {}",
        if active { "active" } else { "inactive" }
    );
    Ok(())
}
