//! Runtime configuration read from the environment (and `.env`).

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

/// How shift commands authenticate against PocketBase.
///
/// A deployment uses exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// One shared admin credential, exchanged for a cached bearer token.
    Admin,
    /// Each Discord user links their own PocketBase auth key with `/login`.
    PerUser,
}

impl AuthMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" | "shared" => Some(AuthMode::Admin),
            "user" | "per-user" | "per_user" => Some(AuthMode::PerUser),
            _ => None,
        }
    }
}

/// Admin credential used in [`AuthMode::Admin`].
#[derive(Clone)]
pub struct AdminCredentials {
    pub identity: String,
    pub password: String,
    pub auth_path: String,
}

impl std::fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("identity", &self.identity)
            .field("auth_path", &self.auth_path)
            .finish_non_exhaustive()
    }
}

pub const DEFAULT_ADMIN_AUTH_PATH: &str = "/api/collections/_superusers/auth-with-password";
pub const DEFAULT_DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// PocketBase connection settings
#[derive(Debug, Clone)]
pub struct PocketBaseSettings {
    pub base_url: String,
    pub auth_mode: AuthMode,
    pub admin: Option<AdminCredentials>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub discord_token: Option<String>,
    pub application_id: Option<u64>,
    pub public_key: Option<String>,
    pub discord_api_base: String,
    /// `None` when `POCKETBASE_URL` is unset; commands then report the backend as unconfigured.
    pub pocketbase: Option<PocketBaseSettings>,
    pub state_path: PathBuf,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup. `from_env` passes `std::env::var`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let discord_token = get("DISCORD_TOKEN");
        let application_id = get("DISCORD_APPLICATION_ID")
            .and_then(|s| s.trim().parse().ok())
            .or_else(|| discord_token.as_deref().and_then(application_id_from_token));

        let auth_mode = match get("POCKETBASE_AUTH_MODE") {
            Some(raw) => AuthMode::parse(&raw).unwrap_or_else(|| {
                warn!("Unknown POCKETBASE_AUTH_MODE '{}', using admin", raw);
                AuthMode::Admin
            }),
            None => AuthMode::Admin,
        };

        let admin = match (get("POCKETBASE_ADMIN_EMAIL"), get("POCKETBASE_ADMIN_PASSWORD")) {
            (Some(identity), Some(password)) => Some(AdminCredentials {
                identity,
                password,
                auth_path: get("POCKETBASE_ADMIN_AUTH_PATH")
                    .unwrap_or_else(|| DEFAULT_ADMIN_AUTH_PATH.to_string()),
            }),
            _ => None,
        };

        let timeout = Duration::from_secs(
            get("POCKETBASE_TIMEOUT_SECS")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(10),
        );

        let pocketbase = get("POCKETBASE_URL").map(|url| PocketBaseSettings {
            base_url: url.trim().trim_end_matches('/').to_string(),
            auth_mode,
            admin: admin.clone(),
            timeout,
        });

        Self {
            discord_token,
            application_id,
            public_key: get("DISCORD_PUBLIC_KEY"),
            discord_api_base: get("DISCORD_API_BASE")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_DISCORD_API_BASE.to_string()),
            pocketbase,
            state_path: get("STATE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("state")),
        }
    }
}

/// Extract the application id encoded in the first segment of a bot token.
pub fn application_id_from_token(token: &str) -> Option<u64> {
    use base64::Engine;

    let segment = token.split('.').next()?;
    // Discord tokens use URL-safe base64 without padding, older ones standard
    let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(segment)
        .or_else(|_| base64::engine::general_purpose::STANDARD_NO_PAD.decode(segment))
        .ok()?;
    String::from_utf8(decoded).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Settings {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults_without_backend() {
        let s = settings(&[]);
        assert!(s.pocketbase.is_none());
        assert_eq!(s.discord_api_base, DEFAULT_DISCORD_API_BASE);
        assert_eq!(s.state_path, PathBuf::from("state"));
    }

    #[test]
    fn test_pocketbase_settings() {
        let s = settings(&[
            ("POCKETBASE_URL", "https://pb.example.com/"),
            ("POCKETBASE_AUTH_MODE", "user"),
            ("POCKETBASE_TIMEOUT_SECS", "3"),
        ]);
        let pb = s.pocketbase.unwrap();
        assert_eq!(pb.base_url, "https://pb.example.com");
        assert_eq!(pb.auth_mode, AuthMode::PerUser);
        assert_eq!(pb.timeout, Duration::from_secs(3));
        assert!(pb.admin.is_none());
    }

    #[test]
    fn test_auth_mode_defaults_to_admin() {
        let s = settings(&[("POCKETBASE_URL", "http://localhost:8090")]);
        assert_eq!(s.pocketbase.unwrap().auth_mode, AuthMode::Admin);

        let s = settings(&[
            ("POCKETBASE_URL", "http://localhost:8090"),
            ("POCKETBASE_AUTH_MODE", "sideways"),
        ]);
        assert_eq!(s.pocketbase.unwrap().auth_mode, AuthMode::Admin);
    }

    #[test]
    fn test_admin_credentials_need_both_values() {
        let s = settings(&[
            ("POCKETBASE_URL", "http://localhost:8090"),
            ("POCKETBASE_ADMIN_EMAIL", "bot@example.com"),
        ]);
        assert!(s.pocketbase.unwrap().admin.is_none());

        let s = settings(&[
            ("POCKETBASE_URL", "http://localhost:8090"),
            ("POCKETBASE_ADMIN_EMAIL", "bot@example.com"),
            ("POCKETBASE_ADMIN_PASSWORD", "hunter2"),
        ]);
        let admin = s.pocketbase.unwrap().admin.unwrap();
        assert_eq!(admin.auth_path, DEFAULT_ADMIN_AUTH_PATH);
        assert!(!format!("{:?}", admin).contains("hunter2"));
    }

    #[test]
    fn test_application_id_from_token() {
        // "123456789012345678" base64-encoded, followed by dummy segments
        let token = "MTIzNDU2Nzg5MDEyMzQ1Njc4.GabcDe.signature";
        assert_eq!(application_id_from_token(token), Some(123456789012345678));
        assert_eq!(application_id_from_token("not-a-token"), None);
    }

    #[test]
    fn test_explicit_application_id_wins() {
        let s = settings(&[
            ("DISCORD_TOKEN", "MTIzNDU2Nzg5MDEyMzQ1Njc4.GabcDe.signature"),
            ("DISCORD_APPLICATION_ID", "42"),
        ]);
        assert_eq!(s.application_id, Some(42));
    }

    #[test]
    fn test_auth_mode_parse() {
        assert_eq!(AuthMode::parse("Admin"), Some(AuthMode::Admin));
        assert_eq!(AuthMode::parse("per-user"), Some(AuthMode::PerUser));
        assert_eq!(AuthMode::parse("both"), None);
    }
}
