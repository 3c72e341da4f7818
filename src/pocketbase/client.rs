//! REST client for the `users` and `shifts` collections.

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::admin::SharedAdminSession;
use super::models::{CompletedShift, ListResult, NewShift, ShiftRecord, ShiftStatus, UserRecord};
use crate::config::{AuthMode, PocketBaseSettings};
use crate::error::{Result, ShiftError};

const USERS_PATH: &str = "/api/collections/users/records";
const SHIFTS_PATH: &str = "/api/collections/shifts/records";
const GENERIC_FAILURE: &str = "PocketBase request failed.";

/// Credential attached to a single backend call.
#[derive(Debug, Clone, Copy)]
pub enum Credential<'a> {
    /// Use the shared, cached admin token.
    Admin,
    /// Forward a user's own auth key verbatim.
    User(&'a str),
}

struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(&'static str, String)>,
    body: Option<serde_json::Value>,
}

impl ApiRequest {
    fn get(path: &str) -> Self {
        Self {
            method: Method::GET,
            path: path.to_string(),
            query: Vec::new(),
            body: None,
        }
    }

    fn with_body(method: Method, path: String, body: impl Serialize) -> Result<Self> {
        Ok(Self {
            method,
            path,
            query: Vec::new(),
            body: Some(serde_json::to_value(body)?),
        })
    }

    fn query(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.query.push((key, value.into()));
        self
    }
}

pub struct PocketBaseClient {
    base_url: String,
    auth_mode: AuthMode,
    http: reqwest::Client,
    admin: Option<SharedAdminSession>,
}

impl PocketBaseClient {
    pub fn new(settings: &PocketBaseSettings, admin: Option<SharedAdminSession>) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(settings.timeout).build()?;
        Ok(Self {
            base_url: settings.base_url.clone(),
            auth_mode: settings.auth_mode,
            http,
            admin,
        })
    }

    pub fn auth_mode(&self) -> AuthMode {
        self.auth_mode
    }

    pub async fn get_user_by_discord_id(
        &self,
        credential: Credential<'_>,
        discord_id: u64,
    ) -> Result<UserRecord> {
        let request = ApiRequest::get(USERS_PATH)
            .query("filter", filter_eq("discord_user_id", &discord_id.to_string()))
            .query("perPage", "1");
        let result: ListResult<UserRecord> = self.send(request, credential).await?;
        result.items.into_iter().next().ok_or_else(|| {
            ShiftError::not_linked("No PocketBase user is linked to your Discord account.")
        })
    }

    pub async fn get_active_shift(
        &self,
        credential: Credential<'_>,
        user_id: &str,
    ) -> Result<Option<ShiftRecord>> {
        let filter = format!(
            "{} && {}",
            filter_eq("user", user_id),
            filter_eq("status", "active")
        );
        let request = ApiRequest::get(SHIFTS_PATH)
            .query("filter", filter)
            .query("perPage", "1");
        let result: ListResult<ShiftRecord> = self.send(request, credential).await?;
        Ok(result.items.into_iter().next())
    }

    pub async fn create_shift(&self, credential: Credential<'_>, user_id: &str) -> Result<ShiftRecord> {
        let request = ApiRequest::with_body(
            Method::POST,
            SHIFTS_PATH.to_string(),
            NewShift {
                user: user_id,
                status: ShiftStatus::Active,
            },
        )?;
        self.send(request, credential).await
    }

    pub async fn complete_shift(
        &self,
        credential: Credential<'_>,
        shift_id: &str,
        end_time: &str,
        duration_minutes: i64,
    ) -> Result<ShiftRecord> {
        let request = ApiRequest::with_body(
            Method::PATCH,
            format!("{}/{}", SHIFTS_PATH, shift_id),
            CompletedShift {
                end_time,
                status: ShiftStatus::Completed,
                duration_minutes,
            },
        )?;
        self.send(request, credential).await
    }

    pub async fn get_latest_shift(
        &self,
        credential: Credential<'_>,
        user_id: &str,
    ) -> Result<Option<ShiftRecord>> {
        let request = ApiRequest::get(SHIFTS_PATH)
            .query("filter", filter_eq("user", user_id))
            .query("sort", "-start_time")
            .query("perPage", "1");
        let result: ListResult<ShiftRecord> = self.send(request, credential).await?;
        Ok(result.items.into_iter().next())
    }

    async fn send<T: DeserializeOwned>(&self, request: ApiRequest, credential: Credential<'_>) -> Result<T> {
        let response = match credential {
            Credential::User(token) => {
                let response = self.execute(&request, token).await?;
                if response.status() == StatusCode::UNAUTHORIZED {
                    warn!("PocketBase rejected a user auth key on {} {}", request.method, request.path);
                    return Err(ShiftError::auth(
                        "PocketBase rejected your auth key. Please run /login again.",
                    ));
                }
                response
            }
            Credential::Admin => {
                let admin = self.admin.as_ref().ok_or(ShiftError::NotConfigured)?;
                let token = admin.token(&self.http, &self.base_url).await?;
                let response = self.execute(&request, &token).await?;
                if response.status() != StatusCode::UNAUTHORIZED {
                    response
                } else {
                    warn!("PocketBase rejected the cached admin token, re-authenticating");
                    admin.invalidate(&token).await;
                    let token = admin.token(&self.http, &self.base_url).await?;
                    let response = self.execute(&request, &token).await?;
                    if response.status() == StatusCode::UNAUTHORIZED {
                        return Err(ShiftError::auth(
                            "PocketBase rejected the bot's admin credentials. Please contact a bot administrator.",
                        ));
                    }
                    response
                }
            }
        };

        let status = response.status();
        let body = response.text().await?;
        if status.is_client_error() || status.is_server_error() {
            debug!("PocketBase returned {} for {} {}", status, request.method, request.path);
            return Err(ShiftError::backend(error_message_from_body(&body)));
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn execute(&self, request: &ApiRequest, token: &str) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self
            .http
            .request(request.method.clone(), &url)
            .bearer_auth(token);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        Ok(builder.send().await?)
    }
}

/// `field="value"` with quotes and backslashes escaped
fn filter_eq(field: &str, value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("{}=\"{}\"", field, escaped)
}

/// Pull a human-readable message out of a PocketBase error body.
pub(crate) fn error_message_from_body(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => extract_error_message(&value),
        Err(_) if !body.trim().is_empty() => body.trim().to_string(),
        Err(_) => GENERIC_FAILURE.to_string(),
    }
}

fn extract_error_message(value: &serde_json::Value) -> String {
    let Some(obj) = value.as_object() else {
        return match value {
            serde_json::Value::Null => GENERIC_FAILURE.to_string(),
            serde_json::Value::String(s) if s.is_empty() => GENERIC_FAILURE.to_string(),
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
    };

    let message = ["message", "error"]
        .iter()
        .filter_map(|key| obj.get(*key).and_then(|v| v.as_str()))
        .find(|s| !s.is_empty());

    let details: Vec<String> = obj
        .get("data")
        .and_then(|d| d.as_object())
        .map(|fields| {
            fields
                .iter()
                .filter_map(|(field, detail)| match detail {
                    serde_json::Value::Object(inner) => inner
                        .get("message")
                        .and_then(|m| m.as_str())
                        .filter(|m| !m.is_empty())
                        .map(|m| format!("{}: {}", field, m)),
                    serde_json::Value::Null | serde_json::Value::Bool(false) => None,
                    serde_json::Value::String(s) if s.is_empty() => None,
                    serde_json::Value::String(s) => Some(format!("{}: {}", field, s)),
                    other => Some(format!("{}: {}", field, other)),
                })
                .collect()
        })
        .unwrap_or_default();

    match (message, details.is_empty()) {
        (Some(message), false) => format!("{}: {}", message, details.join("; ")),
        (None, false) => details.join("; "),
        (Some(message), true) => message.to_string(),
        (None, true) => GENERIC_FAILURE.to_string(),
    }
}
