use tracing::info;

use crate::shifts::Reply;
use crate::{Context, Error};

/// Commands listed by `/help`, in registration order
const COMMAND_HELP: &[(&str, &str)] = &[
    ("/ping", "Check if the bot is alive"),
    ("/help", "List all commands the bot has loaded"),
    ("/login", "Link your PocketBase auth key so you can use the shift commands"),
    ("/start-shift", "Start your shift and log it in PocketBase"),
    ("/end-shift", "End your active shift and record it in PocketBase"),
    ("/shift-status", "Check your current shift or view the most recent shift on record"),
];

pub fn pong_reply() -> Reply {
    Reply::success("🏓 Pong!", "Bot is working!").public()
}

pub fn help_reply() -> Reply {
    COMMAND_HELP
        .iter()
        .fold(
            Reply::success("Bot Commands", "Available commands:"),
            |reply, (name, description)| reply.field(*name, *description),
        )
}

/// Check if the bot is alive
#[poise::command(slash_command)]
pub async fn ping(ctx: Context<'_>) -> Result<(), Error> {
    info!("Ping command called by {}", ctx.author().name);
    ctx.send(pong_reply().to_create_reply()).await?;
    Ok(())
}

/// List all commands the bot has loaded
#[poise::command(slash_command)]
pub async fn help(ctx: Context<'_>) -> Result<(), Error> {
    ctx.send(help_reply().to_create_reply()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_help_lists_every_command() {
        let reply = help_reply();
        assert!(reply.ephemeral);
        let names: Vec<&str> = reply.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            ["/ping", "/help", "/login", "/start-shift", "/end-shift", "/shift-status"]
        );
    }

    #[test]
    fn test_pong_is_public() {
        let reply = pong_reply();
        assert!(!reply.ephemeral);
        assert!(!reply.is_error());
    }
}
