//! Implementation of the `questline status` command.

use crate::cli::AppContext;
use crate::domain::ports::QuestRepository;
use anyhow::Result;
use clap::Args;

#[derive(Args, Debug)]
pub struct StatusArgs {
    #[arg(long)]
    pub user: String,

    #[arg(long)]
    pub guild: String,
}

pub async fn execute(args: StatusArgs) -> Result<()> {
    let ctx = AppContext::init().await?;

    let total_xp = ctx.quests.xp_total(&args.user, &args.guild).await?;
    println!("User {} in guild {}", args.user, args.guild);
    println!("  total XP: {total_xp}");

    match ctx
        .quests
        .get_active_assignment(&args.user, &args.guild)
        .await?
    {
        Some(assignment) => {
            let quest = ctx.quests.get_quest(assignment.quest_id).await?;
            let name = quest.map_or_else(|| assignment.quest_id.to_string(), |q| q.name);
            let remaining =
                assignment.remaining_attempts(ctx.config.verification.max_attempts);
            println!("  active quest: {name}");
            println!(
                "  failed attempts: {}  submissions remaining: {remaining}",
                assignment.attempts
            );
        }
        None => println!("  no active quest"),
    }
    Ok(())
}
