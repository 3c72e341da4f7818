use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use poise::serenity_prelude as serenity;
use tracing::{error, info, warn};

/// Discord bot for logging staff shifts in PocketBase
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Force re-sync of slash commands (use when commands aren't showing up)
    #[arg(long, short = 's')]
    sync_commands: bool,

    /// Register commands per-guild instead of globally (faster for testing)
    #[arg(long)]
    guild_commands: bool,

    /// Specific guild ID to sync commands to (for testing)
    #[arg(long)]
    guild_id: Option<u64>,

    /// Remove registered commands (from --guild-id, or globally) and exit
    #[arg(long)]
    delete_commands: bool,

    /// Serve the HTTP interactions endpoint instead of connecting to the gateway
    #[arg(long)]
    webhook: bool,
}

mod commands;
mod config;
mod error;
mod logging;
mod pocketbase;
mod shifts;
mod state;
mod web;

use commands::{all_commands, delete_commands, register_commands, Scope};
use config::{AuthMode, Settings};
use pocketbase::{create_shared_admin_session, PocketBaseClient};
use shifts::{create_shared_shift_service, Reply, SharedShiftService, ShiftService};
use state::{create_shared_token_store, TokenStore};

type Error = Box<dyn std::error::Error + Send + Sync>;
type Context<'a> = poise::Context<'a, Data, Error>;

/// Shared application state
pub struct Data {
    pub shifts: SharedShiftService,
}

/// Wire the token store and PocketBase client into the shift service
async fn build_shift_service(settings: &Settings) -> Result<SharedShiftService> {
    // Ensure state directory exists
    tokio::fs::create_dir_all(&settings.state_path).await.ok();

    let store_path = settings.state_path.join("linked_accounts.json");
    let tokens = TokenStore::open(&store_path).await.unwrap_or_else(|e| {
        warn!("Could not load linked accounts: {}, using in-memory store", e);
        TokenStore::in_memory()
    });

    let backend = match &settings.pocketbase {
        Some(pb) => {
            let admin = match (pb.auth_mode, &pb.admin) {
                (AuthMode::Admin, Some(credentials)) => {
                    Some(create_shared_admin_session(credentials.clone()))
                }
                (AuthMode::Admin, None) => {
                    warn!("POCKETBASE_ADMIN_EMAIL or POCKETBASE_ADMIN_PASSWORD not set; shift commands will fail until they are");
                    None
                }
                (AuthMode::PerUser, _) => None,
            };
            info!("PocketBase at {} ({:?} auth)", pb.base_url, pb.auth_mode);
            Some(PocketBaseClient::new(pb, admin)?)
        }
        None => {
            warn!("POCKETBASE_URL not set; shift commands will report the integration as unconfigured");
            None
        }
    };

    Ok(create_shared_shift_service(ShiftService::new(
        backend,
        create_shared_token_store(tokens),
    )))
}

/// REST client for command management outside the gateway
fn rest_client(settings: &Settings) -> Result<Arc<serenity::Http>> {
    let token = settings
        .discord_token
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("Missing DISCORD_TOKEN environment variable"))?;
    let application_id = settings.application_id.ok_or_else(|| {
        anyhow::anyhow!("Missing DISCORD_APPLICATION_ID and it could not be read from the token")
    })?;

    let http = serenity::Http::new(token);
    http.set_application_id(serenity::ApplicationId::new(application_id));
    Ok(Arc::new(http))
}

async fn run_webhook(args: &Args, settings: Settings, shifts: SharedShiftService) -> Result<()> {
    if args.sync_commands {
        let http = rest_client(&settings)?;
        let scope = Scope::from_flags(args.guild_commands, args.guild_id, &[]);
        register_commands(&http, &all_commands(), &scope).await;
    }

    let verifier = match settings.public_key.as_deref() {
        Some(key) => match web::SignatureVerifier::from_hex(key) {
            Ok(verifier) => Some(Arc::new(verifier)),
            Err(e) => {
                error!("{}; every interaction will be rejected", e);
                None
            }
        },
        None => {
            warn!("DISCORD_PUBLIC_KEY not set; every interaction will be rejected");
            None
        }
    };

    let state = web::InteractionsState {
        verifier,
        shifts,
        followup: web::FollowupClient::new(&settings.discord_api_base),
    };
    web::start_interactions_server(web::WebServerConfig::from_env(), state).await
}

async fn run_gateway(args: &Args, settings: Settings, shifts: SharedShiftService) -> Result<()> {
    let token = settings
        .discord_token
        .clone()
        .ok_or_else(|| anyhow::anyhow!("Missing DISCORD_TOKEN environment variable"))?;

    if let Some(id) = settings.application_id {
        info!("Application ID: {} (https://discord.com/developers/applications/{}/bot)", id, id);
    }

    // Extract CLI flags for use in setup
    let sync_commands = args.sync_commands;
    let guild_commands = args.guild_commands;
    let target_guild_id = args.guild_id;

    if sync_commands {
        info!("--sync-commands: Will force re-register slash commands");
    }
    if guild_commands {
        info!("--guild-commands: Will register commands per-guild (faster for testing)");
    } else {
        info!("Registering commands globally by default (takes up to 1 hour to propagate)");
    }
    if let Some(gid) = target_guild_id {
        info!("--guild-id: Targeting specific guild {}", gid);
    }

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: all_commands(),
            pre_command: |ctx| {
                Box::pin(async move {
                    info!(
                        "Command '{}' invoked by {} (ID: {}) in {}",
                        ctx.command().qualified_name,
                        ctx.author().name,
                        ctx.author().id,
                        ctx.guild_id().map(|g| g.to_string()).unwrap_or_else(|| "DM".to_string())
                    );
                })
            },
            post_command: |ctx| {
                Box::pin(async move {
                    info!(
                        "Command '{}' completed for {}",
                        ctx.command().qualified_name,
                        ctx.author().name
                    );
                })
            },
            on_error: |error| {
                Box::pin(async move {
                    match error {
                        poise::FrameworkError::Command { error, ctx, .. } => {
                            error!("Error in command '{}': {}", ctx.command().qualified_name, error);
                            let reply = Reply::error(format!("An error occurred: {}", error));
                            let _ = ctx.send(reply.to_create_reply()).await;
                        }
                        poise::FrameworkError::ArgumentParse { error, input, ctx, .. } => {
                            error!("Argument parse error in '{}': {} (input: {:?})", ctx.command().qualified_name, error, input);
                        }
                        other => {
                            error!("Other framework error: {}", other);
                        }
                    }
                })
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Bot logged in as: {}", ready.user.name);

                let joined: Vec<serenity::GuildId> = ready.guilds.iter().map(|g| g.id).collect();
                let scope = Scope::from_flags(guild_commands || sync_commands, target_guild_id, &joined);
                register_commands(&ctx.http, &framework.options().commands, &scope).await;

                Ok(Data { shifts })
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged();

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await?;

    info!("Starting bot...");
    client.start().await?;
    warn!("Bot ended.");

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();
    logging::init();

    let settings = Settings::from_env();

    if args.delete_commands {
        let http = rest_client(&settings)?;
        let scope = Scope::from_flags(false, args.guild_id, &[]);
        return delete_commands(&http, &scope).await;
    }

    let shifts = build_shift_service(&settings).await?;

    if args.webhook {
        run_webhook(&args, settings, shifts).await
    } else {
        run_gateway(&args, settings, shifts).await
    }
}
