//! Implementation of the `questline author` command: one turn of the
//! conversational quest builder.

use crate::cli::commands::enforce_rate_limit;
use crate::cli::AppContext;
use crate::services::BuilderReply;
use anyhow::Result;
use clap::Args;

#[derive(Args, Debug)]
pub struct AuthorArgs {
    #[arg(long)]
    pub user: String,

    #[arg(long)]
    pub guild: String,

    /// Your message to the builder ("cancel" aborts the conversation)
    pub message: String,
}

pub async fn execute(args: AuthorArgs) -> Result<()> {
    let ctx = AppContext::init().await?;
    enforce_rate_limit(&ctx.limiter, &args.user, "author").await?;

    match ctx.builder.turn(&args.user, &args.guild, &args.message).await? {
        BuilderReply::Cancelled => {
            println!("Conversation cancelled; the draft has been discarded.");
        }
        BuilderReply::Created {
            quest_id,
            quest_name,
            task_count,
        } => {
            println!("Quest created: {quest_name} ({quest_id})");
            println!("  tasks: {task_count}");
        }
        BuilderReply::Gathering {
            assistant_reply,
            missing,
        } => {
            println!("{assistant_reply}");
            if !missing.is_empty() {
                println!("\nStill needed:");
                for item in missing {
                    println!("  - {item}");
                }
            }
        }
    }
    Ok(())
}
