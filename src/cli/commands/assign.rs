//! Implementation of the `questline assign` command.

use crate::cli::commands::enforce_rate_limit;
use crate::cli::AppContext;
use crate::services::AssignOutcome;
use anyhow::Result;
use clap::Args;

#[derive(Args, Debug)]
pub struct AssignArgs {
    #[arg(long)]
    pub user: String,

    #[arg(long)]
    pub guild: String,
}

pub async fn execute(args: AssignArgs) -> Result<()> {
    let ctx = AppContext::init().await?;
    enforce_rate_limit(&ctx.limiter, &args.user, "assign").await?;

    match ctx.assigner.assign(&args.user, &args.guild).await? {
        AssignOutcome::Assigned(quest) => {
            println!("Assigned: {} ({})", quest.name, quest.id);
            println!("  {}", quest.description);
        }
        AssignOutcome::AlreadyAssigned(quest) => {
            println!(
                "You already have an active quest: {} ({})",
                quest.name, quest.id
            );
        }
        AssignOutcome::AllCompleted { total_xp } => {
            println!("All available quests completed. Total XP: {total_xp}");
        }
        AssignOutcome::NoQuests => {
            println!("No active quests in guild {}", args.guild);
        }
    }
    Ok(())
}
