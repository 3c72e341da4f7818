//! Slash command registration over Discord's REST API

use poise::serenity_prelude as serenity;
use tracing::{error, info, warn};

use crate::{Data, Error};

/// Where commands are registered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Global commands (take up to 1 hour to propagate)
    Global,
    Guilds(Vec<serenity::GuildId>),
}

impl Scope {
    /// Pick the scope from CLI flags. `joined` are the guilds the bot is in,
    /// used for `--guild-commands` without an explicit `--guild-id`.
    pub fn from_flags(
        guild_commands: bool,
        guild_id: Option<u64>,
        joined: &[serenity::GuildId],
    ) -> Self {
        if let Some(gid) = guild_id {
            return Scope::Guilds(vec![serenity::GuildId::new(gid)]);
        }
        if guild_commands {
            if joined.is_empty() {
                warn!("--guild-commands given but no guilds are known, registering globally");
                return Scope::Global;
            }
            return Scope::Guilds(joined.to_vec());
        }
        Scope::Global
    }
}

pub async fn register_commands(
    http: &serenity::Http,
    commands: &[poise::Command<Data, Error>],
    scope: &Scope,
) {
    match scope {
        Scope::Global => {
            info!("Registering commands globally...");
            if let Err(e) = poise::builtins::register_globally(http, commands).await {
                error!("Failed to register commands globally: {}", e);
            } else {
                info!(
                    "Successfully registered {} commands globally (may take up to 1 hour to propagate)",
                    commands.len()
                );
            }
        }
        Scope::Guilds(guilds) => {
            for guild_id in guilds {
                info!("Registering commands to guild: {}", guild_id);
                if let Err(e) = poise::builtins::register_in_guild(http, commands, *guild_id).await {
                    error!("Failed to register commands for guild {}: {}", guild_id, e);
                } else {
                    info!(
                        "Successfully registered {} commands for guild {}",
                        commands.len(),
                        guild_id
                    );
                }
            }
        }
    }
}

/// Remove every registered command in `scope`
pub async fn delete_commands(http: &serenity::Http, scope: &Scope) -> anyhow::Result<()> {
    match scope {
        Scope::Global => {
            info!("Deleting global commands...");
            serenity::Command::set_global_commands(http, Vec::new()).await?;
            info!("Deleted all global commands");
        }
        Scope::Guilds(guilds) => {
            for guild_id in guilds {
                info!("Deleting commands from guild: {}", guild_id);
                guild_id.set_commands(http, Vec::new()).await?;
                info!("Deleted all commands from guild {}", guild_id);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_guild_wins() {
        let joined = [serenity::GuildId::new(1), serenity::GuildId::new(2)];
        assert_eq!(
            Scope::from_flags(true, Some(99), &joined),
            Scope::Guilds(vec![serenity::GuildId::new(99)])
        );
    }

    #[test]
    fn test_guild_commands_use_joined_guilds() {
        let joined = [serenity::GuildId::new(1), serenity::GuildId::new(2)];
        assert_eq!(
            Scope::from_flags(true, None, &joined),
            Scope::Guilds(joined.to_vec())
        );
        assert_eq!(Scope::from_flags(true, None, &[]), Scope::Global);
    }

    #[test]
    fn test_default_is_global() {
        assert_eq!(
            Scope::from_flags(false, None, &[serenity::GuildId::new(1)]),
            Scope::Global
        );
    }

    #[test]
    fn test_command_names() {
        let names: Vec<String> = super::super::all_commands()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(
            names,
            ["ping", "help", "login", "start-shift", "end-shift", "shift-status"]
        );
    }
}
