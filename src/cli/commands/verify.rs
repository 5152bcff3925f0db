//! Implementation of the `questline verify` command.

use crate::cli::commands::enforce_rate_limit;
use crate::cli::AppContext;
use crate::domain::errors::EngineError;
use crate::services::SubmitResult;
use anyhow::Result;
use clap::Args;

#[derive(Args, Debug)]
pub struct VerifyArgs {
    #[arg(long)]
    pub user: String,

    #[arg(long)]
    pub guild: String,

    /// Identifier (wallet, email, ...) for tasks that need one
    #[arg(long)]
    pub identifier: Option<String>,
}

pub async fn execute(args: VerifyArgs) -> Result<()> {
    let ctx = AppContext::init().await?;
    enforce_rate_limit(&ctx.limiter, &args.user, "verify").await?;

    let result = ctx
        .verifier
        .submit_proof(&args.user, &args.guild, args.identifier.as_deref())
        .await;

    match result {
        Ok(SubmitResult::TaskVerified {
            task_title,
            points_awarded,
            quest_completed,
            total_xp,
            message,
        }) => {
            println!("Verified: {task_title} (+{points_awarded} XP)");
            println!("  {message}");
            if quest_completed {
                println!("Quest complete! Total XP: {total_xp}");
            } else {
                println!("Total XP: {total_xp}");
            }
        }
        Ok(SubmitResult::NotVerified {
            message,
            remaining_attempts,
        }) => {
            println!("Not verified: {message}");
            println!("Attempts remaining: {remaining_attempts}");
        }
        Err(EngineError::AttemptsExhausted) => {
            println!("No attempts remaining; the quest has been failed.");
        }
        Err(EngineError::UserInput(message)) => {
            println!("{message}");
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
