//! HTTP interactions endpoint
//!
//! Discord POSTs every interaction here. Requests are verified before the
//! body is parsed. Commands that talk to PocketBase are acknowledged with a
//! deferred response and resolved in a background task that edits the
//! original message once the backend work is done.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use serde::Deserialize;
use tracing::{error, info, warn};

use super::followup::FollowupClient;
use super::signature::SignatureVerifier;
use crate::commands::general::{help_reply, pong_reply};
use crate::shifts::reply::EPHEMERAL_FLAG;
use crate::shifts::{Reply, SharedShiftService, ShiftCommand, ShiftService};

const SIGNATURE_HEADER: &str = "X-Signature-Ed25519";
const TIMESTAMP_HEADER: &str = "X-Signature-Timestamp";

// Interaction types
const PING: u8 = 1;
const APPLICATION_COMMAND: u8 = 2;

// Interaction response types
const PONG: u8 = 1;
const CHANNEL_MESSAGE_WITH_SOURCE: u8 = 4;
const DEFERRED_CHANNEL_MESSAGE_WITH_SOURCE: u8 = 5;

/// Incoming interaction (only the fields this bot reads)
#[derive(Debug, Deserialize)]
pub struct Interaction {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub application_id: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub data: Option<CommandData>,
    /// Present for guild invocations
    #[serde(default)]
    pub member: Option<Member>,
    /// Present for DM invocations
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Deserialize)]
pub struct CommandData {
    pub name: String,
    #[serde(default)]
    pub options: Vec<CommandOption>,
}

#[derive(Debug, Deserialize)]
pub struct CommandOption {
    pub name: String,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct Member {
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Deserialize)]
pub struct User {
    pub id: String,
}

impl Interaction {
    /// Discord id of the invoking user
    pub fn caller_id(&self) -> Option<u64> {
        self.member
            .as_ref()
            .and_then(|m| m.user.as_ref())
            .or(self.user.as_ref())
            .and_then(|u| u.id.parse().ok())
    }

    pub fn command_name(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.name.as_str())
    }

    pub fn string_option(&self, name: &str) -> Option<&str> {
        self.data
            .as_ref()?
            .options
            .iter()
            .find(|o| o.name == name)?
            .value
            .as_ref()?
            .as_str()
    }
}

/// A backend command waiting to be resolved.
///
/// `acknowledge` yields the immediate deferred response; `resolve` consumes
/// the value, runs the command and delivers the result.
#[derive(Debug)]
pub struct DeferredCommand {
    pub application_id: String,
    pub token: String,
    pub caller: u64,
    pub command: ShiftCommand,
}

impl DeferredCommand {
    pub fn acknowledge(&self) -> serde_json::Value {
        serde_json::json!({
            "type": DEFERRED_CHANNEL_MESSAGE_WITH_SOURCE,
            "data": { "flags": EPHEMERAL_FLAG }
        })
    }

    pub async fn resolve(self, shifts: &ShiftService, followup: &FollowupClient) -> anyhow::Result<()> {
        let reply = shifts.run(&self.command, self.caller).await;
        followup
            .edit_original(&self.application_id, &self.token, &reply)
            .await?;
        info!("Command '{}' completed for {}", self.command.name(), self.caller);
        Ok(())
    }
}

/// What to do with a verified interaction
#[derive(Debug)]
pub enum Routed {
    Immediate(serde_json::Value),
    Deferred(DeferredCommand),
}

pub fn route(interaction: &Interaction) -> Routed {
    match interaction.kind {
        PING => Routed::Immediate(serde_json::json!({ "type": PONG })),
        APPLICATION_COMMAND => route_command(interaction),
        other => {
            warn!("Unsupported interaction type {}", other);
            Routed::Immediate(message_response(&Reply::error("Unsupported interaction type")))
        }
    }
}

fn route_command(interaction: &Interaction) -> Routed {
    let name = interaction.command_name().unwrap_or_default();
    info!(
        "Command '{}' invoked by {}",
        name,
        interaction
            .caller_id()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "unknown user".to_string())
    );

    let command = match name {
        "ping" => return Routed::Immediate(message_response(&pong_reply())),
        "help" => return Routed::Immediate(message_response(&help_reply())),
        "login" => ShiftCommand::Login {
            auth_key: interaction.string_option("auth_key").unwrap_or_default().to_string(),
        },
        "start-shift" => ShiftCommand::Start,
        "end-shift" => ShiftCommand::End,
        "shift-status" => ShiftCommand::Status,
        unknown => {
            return Routed::Immediate(message_response(&Reply::error(format!(
                "Unknown command: {}",
                unknown
            ))))
        }
    };

    match (
        interaction.application_id.clone(),
        interaction.token.clone(),
        interaction.caller_id(),
    ) {
        (Some(application_id), Some(token), Some(caller)) => Routed::Deferred(DeferredCommand {
            application_id,
            token,
            caller,
            command,
        }),
        _ => Routed::Immediate(message_response(&Reply::error(
            "Could not identify who invoked this command.",
        ))),
    }
}

fn message_response(reply: &Reply) -> serde_json::Value {
    serde_json::json!({
        "type": CHANNEL_MESSAGE_WITH_SOURCE,
        "data": reply.message_json()
    })
}

/// Shared state for the interactions endpoint
#[derive(Clone)]
pub struct InteractionsState {
    /// `None` when no public key is configured; every request then fails with 500
    pub verifier: Option<Arc<SignatureVerifier>>,
    pub shifts: SharedShiftService,
    pub followup: FollowupClient,
}

pub fn interactions_router(state: InteractionsState) -> Router {
    Router::new()
        .route("/interactions", any(handle_interaction))
        .with_state(state)
}

fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

async fn handle_interaction(
    State(state): State<InteractionsState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(verifier) = state.verifier.as_ref() else {
        error!("Rejecting interaction: DISCORD_PUBLIC_KEY is not configured");
        return json_error(StatusCode::INTERNAL_SERVER_ERROR, "Missing DISCORD_PUBLIC_KEY");
    };

    if method != Method::POST {
        return json_error(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed");
    }

    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    let (Some(signature), Some(timestamp)) = (header(SIGNATURE_HEADER), header(TIMESTAMP_HEADER)) else {
        return json_error(StatusCode::UNAUTHORIZED, "Missing signature headers");
    };

    if !verifier.verify(signature, timestamp, &body) {
        warn!("Rejected interaction with invalid signature");
        return json_error(StatusCode::UNAUTHORIZED, "Invalid signature");
    }

    let interaction: Interaction = match serde_json::from_slice(&body) {
        Ok(interaction) => interaction,
        Err(e) => {
            warn!("Failed to parse interaction: {}", e);
            return json_error(StatusCode::BAD_REQUEST, "Malformed interaction");
        }
    };

    match route(&interaction) {
        Routed::Immediate(response) => Json(response).into_response(),
        Routed::Deferred(deferred) => {
            let ack = deferred.acknowledge();
            let shifts = state.shifts.clone();
            let followup = state.followup.clone();
            tokio::spawn(async move {
                let name = deferred.command.name();
                if let Err(e) = deferred.resolve(&shifts, &followup).await {
                    error!("Failed to deliver result of '{}': {}", name, e);
                }
            });
            Json(ack).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shifts::create_shared_shift_service;
    use crate::state::{create_shared_token_store, TokenStore};
    use crate::web::signature::test_keys::{public_key_hex, sign};
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn unconfigured_service() -> SharedShiftService {
        create_shared_shift_service(ShiftService::new(
            None,
            create_shared_token_store(TokenStore::in_memory()),
        ))
    }

    fn app(with_key: bool) -> Router {
        let verifier = with_key
            .then(|| Arc::new(SignatureVerifier::from_hex(&public_key_hex()).unwrap()));
        interactions_router(InteractionsState {
            verifier,
            shifts: unconfigured_service(),
            followup: FollowupClient::new("http://127.0.0.1:9"),
        })
    }

    fn signed_request(body: &str, timestamp: &str, signature: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/interactions")
            .header("content-type", "application/json")
            .header(SIGNATURE_HEADER, signature)
            .header(TIMESTAMP_HEADER, timestamp)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(req).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    async fn post_signed(body: &str) -> (StatusCode, serde_json::Value) {
        let req = signed_request(body, "1700000000", &sign("1700000000", body.as_bytes()));
        send(app(true), req).await
    }

    fn command(name: &str) -> String {
        serde_json::json!({
            "type": 2,
            "application_id": "111",
            "token": "interaction-token",
            "member": { "user": { "id": "42" } },
            "data": { "name": name }
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_ping_is_ponged() {
        let (status, json) = post_signed(r#"{"type":1}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, serde_json::json!({"type": 1}));
    }

    #[tokio::test]
    async fn test_tampered_body_is_unauthorized() {
        let signature = sign("1700000000", br#"{"type":1}"#);
        let req = signed_request(r#"{"type":2}"#, "1700000000", &signature);
        let (status, _) = send(app(true), req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_tampered_timestamp_is_unauthorized() {
        let signature = sign("1700000000", br#"{"type":1}"#);
        let req = signed_request(r#"{"type":1}"#, "1700000999", &signature);
        let (status, _) = send(app(true), req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_missing_headers_are_unauthorized() {
        let req = Request::builder()
            .method("POST")
            .uri("/interactions")
            .body(Body::from(r#"{"type":1}"#))
            .unwrap();
        let (status, json) = send(app(true), req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"], "Missing signature headers");
    }

    #[tokio::test]
    async fn test_non_post_is_rejected() {
        let req = Request::builder()
            .method("GET")
            .uri("/interactions")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(app(true), req).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_missing_public_key_is_server_error() {
        let body = r#"{"type":1}"#;
        let req = signed_request(body, "1700000000", &sign("1700000000", body.as_bytes()));
        let (status, _) = send(app(false), req).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let (status, _) = post_signed("not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_ping_command_replies_immediately() {
        let (status, json) = post_signed(&command("ping")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["type"], 4);
        assert!(json["data"]["embeds"][0]["title"]
            .as_str()
            .unwrap()
            .contains("Pong"));
    }

    #[tokio::test]
    async fn test_shift_command_is_deferred() {
        let (status, json) = post_signed(&command("start-shift")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, serde_json::json!({"type": 5, "data": {"flags": 64}}));
    }

    #[tokio::test]
    async fn test_unknown_command_is_ephemeral_error() {
        let (status, json) = post_signed(&command("8ball")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["type"], 4);
        assert_eq!(json["data"]["flags"], 64);
        assert_eq!(
            json["data"]["embeds"][0]["description"],
            "Unknown command: 8ball"
        );
    }

    #[test]
    fn test_route_reads_login_option_and_dm_user() {
        let interaction: Interaction = serde_json::from_value(serde_json::json!({
            "type": 2,
            "application_id": "111",
            "token": "t",
            "user": { "id": "77" },
            "data": {
                "name": "login",
                "options": [{ "name": "auth_key", "type": 3, "value": "pb-key" }]
            }
        }))
        .unwrap();

        match route(&interaction) {
            Routed::Deferred(deferred) => {
                assert_eq!(deferred.caller, 77);
                assert_eq!(
                    deferred.command,
                    ShiftCommand::Login {
                        auth_key: "pb-key".to_string()
                    }
                );
            }
            other => panic!("expected deferred command, got {:?}", other),
        }
    }

    #[test]
    fn test_command_without_caller_is_not_deferred() {
        let interaction: Interaction = serde_json::from_value(serde_json::json!({
            "type": 2,
            "data": { "name": "end-shift" }
        }))
        .unwrap();
        assert!(matches!(route(&interaction), Routed::Immediate(_)));
    }

    #[tokio::test]
    async fn test_resolve_edits_original_message() {
        let mut server = mockito::Server::new_async().await;
        let edit = server
            .mock("PATCH", "/webhooks/111/interaction-token/messages/@original")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "embeds": [{
                    "description": "The PocketBase integration is not configured. Please contact a bot administrator."
                }]
            })))
            .with_status(200)
            .with_body("{}")
            .expect(1)
            .create_async()
            .await;

        let deferred = DeferredCommand {
            application_id: "111".to_string(),
            token: "interaction-token".to_string(),
            caller: 42,
            command: ShiftCommand::Status,
        };
        let service = unconfigured_service();
        deferred
            .resolve(&service, &FollowupClient::new(&server.url()))
            .await
            .unwrap();
        edit.assert_async().await;
    }
}
