//! Shift commands: identity lookup, the one-active-shift rule, and reply formatting.

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use super::lifecycle::{
    format_minutes, minutes_between, started_at, ShiftClosure, MAX_DURATION_MINUTES,
};
use super::reply::Reply;
use super::timestamp::{format_discord, format_pocketbase, parse_timestamp};
use crate::config::AuthMode;
use crate::error::{Result, ShiftError};
use crate::pocketbase::{Credential, PocketBaseClient, UserRecord};
use crate::state::{LinkedAccount, SharedTokenStore};

/// A shift command as invoked by a Discord user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShiftCommand {
    Login { auth_key: String },
    Start,
    End,
    Status,
}

impl ShiftCommand {
    pub fn name(&self) -> &'static str {
        match self {
            ShiftCommand::Login { .. } => "login",
            ShiftCommand::Start => "start-shift",
            ShiftCommand::End => "end-shift",
            ShiftCommand::Status => "shift-status",
        }
    }
}

/// Credential resolved for one caller
enum CallerCredential {
    Admin,
    User(String),
}

impl CallerCredential {
    fn as_credential(&self) -> Credential<'_> {
        match self {
            CallerCredential::Admin => Credential::Admin,
            CallerCredential::User(token) => Credential::User(token),
        }
    }
}

pub struct ShiftService {
    backend: Option<PocketBaseClient>,
    tokens: SharedTokenStore,
    auth_mode: AuthMode,
}

impl ShiftService {
    pub fn new(backend: Option<PocketBaseClient>, tokens: SharedTokenStore) -> Self {
        let auth_mode = backend
            .as_ref()
            .map(|b| b.auth_mode())
            .unwrap_or(AuthMode::Admin);
        Self {
            backend,
            tokens,
            auth_mode,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.backend.is_some()
    }

    /// Run a command and always produce a reply; failures become error embeds.
    pub async fn run(&self, command: &ShiftCommand, discord_id: u64) -> Reply {
        let result = match command {
            ShiftCommand::Login { auth_key } => self.login(discord_id, auth_key).await,
            ShiftCommand::Start => self.start_shift(discord_id).await,
            ShiftCommand::End => self.end_shift(discord_id).await,
            ShiftCommand::Status => self.shift_status(discord_id).await,
        };

        match result {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Command '{}' failed for {}: {}", command.name(), discord_id, e);
                let purge = !matches!(command, ShiftCommand::Login { .. });
                self.error_reply(discord_id, e, purge).await
            }
        }
    }

    pub async fn login(&self, discord_id: u64, auth_key: &str) -> Result<Reply> {
        let backend = self.backend()?;
        if self.auth_mode == AuthMode::Admin {
            return Ok(Reply::success(
                "No login needed",
                "Shift commands use the bot's shared PocketBase account. You can use them right away.",
            ));
        }

        let auth_key = auth_key.trim();
        if auth_key.is_empty() {
            return Ok(Reply::error("Please provide your PocketBase auth key."));
        }

        let user = backend
            .get_user_by_discord_id(Credential::User(auth_key), discord_id)
            .await?;
        if user.discord_user_id != discord_id.to_string() {
            return Ok(Reply::error(
                "That auth key belongs to a different Discord user. Please make sure you copied your own key.",
            ));
        }

        let mut account = LinkedAccount::new(discord_id, auth_key.to_string());
        account.pocketbase_user_id = Some(user.id.clone());
        account.display_name = Some(user.display_name().to_string());
        self.tokens.set(account).await?;
        info!("Linked Discord user {} to PocketBase user {}", discord_id, user.id);

        let mut reply = Reply::success(
            "PocketBase linked",
            "Your auth key has been stored securely. You can now use the shift commands.",
        )
        .field("PocketBase user", user.display_name());
        if let Some(role) = user.role() {
            reply = reply.field("Role", role);
        }
        Ok(reply.footer("You can update your auth key at any time by running /login again."))
    }

    pub async fn start_shift(&self, discord_id: u64) -> Result<Reply> {
        let backend = self.backend()?;
        let credential = self.credential(discord_id).await?;
        let credential = credential.as_credential();
        let user = self.lookup_user(backend, credential, discord_id).await?;

        if let Some(active) = backend.get_active_shift(credential, &user.id).await? {
            let mut reply = Reply::error(
                "You already have an active shift. Please end it before starting a new one.",
            );
            if let Some(raw) = active.start_time() {
                reply = reply.field("Current shift started", format_discord(parse_timestamp(raw)?));
            }
            return Ok(reply);
        }

        let created = backend.create_shift(credential, &user.id).await?;
        let start = started_at(&created, self.now())?;
        info!("Shift {} started for {} ({})", created.id, user.display_name(), discord_id);

        Ok(Reply::success(
            "Shift started",
            format!("<@{}>, your shift has been logged.", discord_id),
        )
        .field("Start time", format_discord(start)))
    }

    pub async fn end_shift(&self, discord_id: u64) -> Result<Reply> {
        let backend = self.backend()?;
        let credential = self.credential(discord_id).await?;
        let credential = credential.as_credential();
        let user = self.lookup_user(backend, credential, discord_id).await?;

        let Some(active) = backend.get_active_shift(credential, &user.id).await? else {
            return Ok(Reply::error("You do not have an active shift to end."));
        };

        let closure = ShiftClosure::for_shift(&active, self.now())?;
        backend
            .complete_shift(
                credential,
                &closure.shift_id,
                &format_pocketbase(closure.end),
                closure.duration.recorded_minutes,
            )
            .await?;
        info!(
            "Shift {} completed for {} ({}): {} min recorded, {} min elapsed",
            closure.shift_id,
            user.display_name(),
            discord_id,
            closure.duration.recorded_minutes,
            closure.duration.elapsed_minutes
        );

        let mut duration_text = format_minutes(closure.duration.recorded_minutes);
        if closure.duration.is_capped() {
            duration_text.push_str(&format!(" (capped at {} minutes)", MAX_DURATION_MINUTES));
        }
        let mut reply = Reply::success(
            "Shift completed",
            format!("<@{}>, your shift has been closed.", discord_id),
        )
        .field("Start time", format_discord(closure.start))
        .field("End time", format_discord(closure.end))
        .field("Duration", duration_text);
        if closure.duration.is_capped() {
            reply = reply.field("Elapsed", format_minutes(closure.duration.elapsed_minutes));
        }
        Ok(reply)
    }

    pub async fn shift_status(&self, discord_id: u64) -> Result<Reply> {
        let backend = self.backend()?;
        let credential = self.credential(discord_id).await?;
        let credential = credential.as_credential();
        let user = self.lookup_user(backend, credential, discord_id).await?;

        if let Some(active) = backend.get_active_shift(credential, &user.id).await? {
            let now = self.now();
            let start = started_at(&active, now)?;
            return Ok(
                Reply::success("Shift status", "You currently have an active shift.")
                    .field("Started", format_discord(start))
                    .field("Elapsed", format_minutes(minutes_between(start, now))),
            );
        }

        let Some(latest) = backend.get_latest_shift(credential, &user.id).await? else {
            return Ok(Reply::success(
                "Shift status",
                "You have not logged any shifts yet.",
            ));
        };

        let mut reply = Reply::success("Shift status", "You do not have an active shift right now.");
        if let Some(raw) = latest.start_time() {
            reply = reply.field("Last shift started", format_discord(parse_timestamp(raw)?));
        }
        if let Some(raw) = latest.end_time() {
            reply = reply.field("Last shift ended", format_discord(parse_timestamp(raw)?));
        }
        if let Some(minutes) = latest.duration_minutes {
            reply = reply.field("Recorded duration", format_minutes(minutes));
        }
        Ok(reply)
    }

    fn backend(&self) -> Result<&PocketBaseClient> {
        self.backend.as_ref().ok_or(ShiftError::NotConfigured)
    }

    async fn credential(&self, discord_id: u64) -> Result<CallerCredential> {
        match self.auth_mode {
            AuthMode::Admin => Ok(CallerCredential::Admin),
            AuthMode::PerUser => self
                .tokens
                .get(discord_id)
                .await
                .map(CallerCredential::User)
                .ok_or_else(|| {
                    ShiftError::not_linked("Please link your PocketBase auth key first by running /login.")
                }),
        }
    }

    async fn lookup_user(
        &self,
        backend: &PocketBaseClient,
        credential: Credential<'_>,
        discord_id: u64,
    ) -> Result<UserRecord> {
        let user = backend.get_user_by_discord_id(credential, discord_id).await?;
        if user.id.trim().is_empty() {
            return Err(ShiftError::backend("PocketBase did not return your user ID."));
        }
        Ok(user)
    }

    async fn error_reply(&self, discord_id: u64, err: ShiftError, purge_on_auth: bool) -> Reply {
        match err {
            ShiftError::Auth { message }
                if purge_on_auth && self.auth_mode == AuthMode::PerUser =>
            {
                if let Err(e) = self.tokens.clear(discord_id).await {
                    error!("Failed to clear auth key for {}: {}", discord_id, e);
                }
                Reply::error(format!("{} Your saved auth key has been removed.", message))
            }
            ShiftError::StateLoad { .. }
            | ShiftError::StateParse { .. }
            | ShiftError::StateSave { .. } => {
                error!("Token store error for {}: {}", discord_id, err);
                Reply::error("Could not update your linked account. Please try again later.")
            }
            other => Reply::error(other.to_string()),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
