//! Cached admin token for the shared-credential auth mode.
//!
//! One `AdminSession` is built at start-up and handed to the client. The
//! cache mutex is held across the login request, so callers that arrive while
//! a login is in flight wait for it and then reuse the token it produced.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::client::error_message_from_body;
use super::models::{AuthResponse, PasswordAuth};
use crate::config::AdminCredentials;
use crate::error::{Result, ShiftError};

pub struct AdminSession {
    credentials: AdminCredentials,
    token: Mutex<Option<String>>,
}

impl AdminSession {
    pub fn new(credentials: AdminCredentials) -> Self {
        Self {
            credentials,
            token: Mutex::new(None),
        }
    }

    #[cfg(test)]
    pub fn with_token(credentials: AdminCredentials, token: &str) -> Self {
        Self {
            credentials,
            token: Mutex::new(Some(token.to_string())),
        }
    }

    /// Return the cached token, logging in first if there is none.
    pub async fn token(&self, http: &reqwest::Client, base_url: &str) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            return Ok(token.clone());
        }

        let token = self.login(http, base_url).await?;
        *cached = Some(token.clone());
        Ok(token)
    }

    /// Drop `rejected` from the cache. A token refreshed by another caller in
    /// the meantime is kept.
    pub async fn invalidate(&self, rejected: &str) {
        let mut cached = self.token.lock().await;
        if cached.as_deref() == Some(rejected) {
            debug!("Clearing rejected PocketBase admin token");
            *cached = None;
        }
    }

    async fn login(&self, http: &reqwest::Client, base_url: &str) -> Result<String> {
        let url = format!("{}{}", base_url, self.credentials.auth_path);
        info!("Authenticating with PocketBase as {}", self.credentials.identity);

        let response = http
            .post(&url)
            .json(&PasswordAuth {
                identity: &self.credentials.identity,
                password: &self.credentials.password,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("PocketBase admin login failed with status {}", status);
            let message = error_message_from_body(&body);
            return Err(if status == reqwest::StatusCode::UNAUTHORIZED
                || status == reqwest::StatusCode::BAD_REQUEST
            {
                ShiftError::auth(format!("PocketBase rejected the bot's admin credentials: {}", message))
            } else {
                ShiftError::backend(message)
            });
        }

        let auth: AuthResponse = response.json().await?;
        Ok(auth.token)
    }
}

pub type SharedAdminSession = Arc<AdminSession>;

pub fn create_shared_admin_session(credentials: AdminCredentials) -> SharedAdminSession {
    Arc::new(AdminSession::new(credentials))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn credentials() -> AdminCredentials {
        AdminCredentials {
            identity: "bot@example.com".to_string(),
            password: "secret".to_string(),
            auth_path: "/api/admins/auth-with-password".to_string(),
        }
    }

    #[tokio::test]
    async fn test_token_is_cached_after_first_login() {
        let mut server = mockito::Server::new_async().await;
        let login = server
            .mock("POST", "/api/admins/auth-with-password")
            .match_body(Matcher::Json(serde_json::json!({
                "identity": "bot@example.com",
                "password": "secret"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"token":"admin-token"}"#)
            .expect(1)
            .create_async()
            .await;

        let session = AdminSession::new(credentials());
        let http = reqwest::Client::new();
        assert_eq!(session.token(&http, &server.url()).await.unwrap(), "admin-token");
        assert_eq!(session.token(&http, &server.url()).await.unwrap(), "admin-token");
        login.assert_async().await;
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_login() {
        let mut server = mockito::Server::new_async().await;
        let login = server
            .mock("POST", "/api/admins/auth-with-password")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"token":"admin-token"}"#)
            .expect(1)
            .create_async()
            .await;

        let session = Arc::new(AdminSession::new(credentials()));
        let http = reqwest::Client::new();
        let url = server.url();

        let mut handles = Vec::new();
        for _ in 0..5 {
            let session = session.clone();
            let http = http.clone();
            let url = url.clone();
            handles.push(tokio::spawn(async move { session.token(&http, &url).await }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "admin-token");
        }
        login.assert_async().await;
    }

    #[tokio::test]
    async fn test_invalidate_keeps_newer_token() {
        let session = AdminSession::with_token(credentials(), "fresh");
        session.invalidate("stale").await;
        assert_eq!(session.token.lock().await.as_deref(), Some("fresh"));

        session.invalidate("fresh").await;
        assert!(session.token.lock().await.is_none());
    }

    #[tokio::test]
    async fn test_rejected_login_is_auth_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/admins/auth-with-password")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"code":400,"message":"Failed to authenticate.","data":{}}"#)
            .create_async()
            .await;

        let session = AdminSession::new(credentials());
        let err = session
            .token(&reqwest::Client::new(), &server.url())
            .await
            .unwrap_err();
        assert!(matches!(err, ShiftError::Auth { .. }));
        assert!(err.to_string().contains("Failed to authenticate."));
    }
}
