//! Webhook front-end
//!
//! Serves Discord's HTTP interactions endpoint as an alternative to the
//! gateway connection.

mod followup;
mod interactions;
mod server;
mod signature;

pub use followup::FollowupClient;
pub use interactions::InteractionsState;
pub use server::{start_interactions_server, WebServerConfig};
pub use signature::SignatureVerifier;
