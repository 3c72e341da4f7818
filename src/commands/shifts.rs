use crate::shifts::ShiftCommand;
use crate::{Context, Error};

/// Answer a shift command. Replies are ephemeral; the backend round trip is
/// deferred unless PocketBase is not configured at all.
async fn run_shift_command(ctx: Context<'_>, command: ShiftCommand) -> Result<(), Error> {
    let shifts = &ctx.data().shifts;
    if shifts.is_configured() {
        ctx.defer_ephemeral().await?;
    }

    let reply = shifts.run(&command, ctx.author().id.get()).await;
    ctx.send(reply.to_create_reply()).await?;
    Ok(())
}

/// Link your PocketBase auth key so you can use the shift commands
#[poise::command(slash_command)]
pub async fn login(
    ctx: Context<'_>,
    #[description = "Your PocketBase auth key from the staff portal"] auth_key: String,
) -> Result<(), Error> {
    run_shift_command(ctx, ShiftCommand::Login { auth_key }).await
}

/// Start your shift and log it in PocketBase
#[poise::command(slash_command, rename = "start-shift")]
pub async fn start_shift(ctx: Context<'_>) -> Result<(), Error> {
    run_shift_command(ctx, ShiftCommand::Start).await
}

/// End your active shift and record it in PocketBase
#[poise::command(slash_command, rename = "end-shift")]
pub async fn end_shift(ctx: Context<'_>) -> Result<(), Error> {
    run_shift_command(ctx, ShiftCommand::End).await
}

/// Check your current shift or view the most recent shift on record
#[poise::command(slash_command, rename = "shift-status")]
pub async fn shift_status(ctx: Context<'_>) -> Result<(), Error> {
    run_shift_command(ctx, ShiftCommand::Status).await
}
