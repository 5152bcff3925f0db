//! Implementation of the `questline activity` subcommands: the write path
//! for derived activity facts, used by ingestion glue and local testing.

use crate::cli::AppContext;
use anyhow::Result;
use chrono::Utc;
use clap::{Args, Subcommand};

#[derive(Args, Debug)]
pub struct ActivityArgs {
    #[command(subcommand)]
    pub command: ActivityCommands,
}

#[derive(Subcommand, Debug)]
pub enum ActivityCommands {
    /// Record one activity event
    Record {
        #[arg(long)]
        user: String,
        #[arg(long)]
        guild: String,
        /// Event kind (message_sent, reaction_added, reaction_received,
        /// poll_created, poll_vote)
        #[arg(long)]
        kind: String,
        #[arg(long)]
        channel: Option<String>,
    },
    /// Grant a role to a user
    GrantRole {
        #[arg(long)]
        user: String,
        #[arg(long)]
        guild: String,
        #[arg(long)]
        role: String,
    },
    /// Revoke a role from a user
    RevokeRole {
        #[arg(long)]
        user: String,
        #[arg(long)]
        guild: String,
        #[arg(long)]
        role: String,
    },
}

pub async fn execute(args: ActivityArgs) -> Result<()> {
    let ctx = AppContext::init().await?;
    match args.command {
        ActivityCommands::Record {
            user,
            guild,
            kind,
            channel,
        } => {
            ctx.activity
                .record_event(&guild, &user, channel.as_deref(), &kind, Utc::now())
                .await?;
            println!("Recorded {kind} for {user} in {guild}");
        }
        ActivityCommands::GrantRole { user, guild, role } => {
            ctx.activity.grant_role(&guild, &user, &role).await?;
            println!("Granted role {role} to {user} in {guild}");
        }
        ActivityCommands::RevokeRole { user, guild, role } => {
            ctx.activity.revoke_role(&guild, &user, &role).await?;
            println!("Revoked role {role} from {user} in {guild}");
        }
    }
    Ok(())
}
