//! Web server hosting the interactions endpoint

use axum::{routing::get, Router};
use axum_server::tls_rustls::RustlsConfig;
use std::{net::SocketAddr, path::PathBuf};
use tracing::info;

use super::interactions::{interactions_router, InteractionsState};

/// Web server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebServerConfig {
    pub port: u16,
    /// Certificate and key PEM files. Plain HTTP is served when unset,
    /// e.g. behind a TLS-terminating proxy.
    pub tls: Option<TlsPaths>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    /// Certificate PEM file (cert + CA bundle)
    pub cert_path: PathBuf,
    /// Private key PEM file
    pub key_path: PathBuf,
}

impl Default for WebServerConfig {
    fn default() -> Self {
        Self { port: 8080, tls: None }
    }
}

impl WebServerConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = lookup("INTERACTIONS_PORT")
            .and_then(|s| s.parse().ok())
            .unwrap_or(8080);
        let tls = match (lookup("TLS_CERT_PATH"), lookup("TLS_KEY_PATH")) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert_path: PathBuf::from(cert),
                key_path: PathBuf::from(key),
            }),
            _ => None,
        };
        Self { port, tls }
    }
}

pub fn app(state: InteractionsState) -> Router {
    Router::new()
        .route("/", get(health))
        .merge(interactions_router(state))
}

/// Serve the interactions endpoint until the process exits
pub async fn start_interactions_server(
    config: WebServerConfig,
    state: InteractionsState,
) -> anyhow::Result<()> {
    let app = app(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    match config.tls {
        Some(tls) => {
            if !tls.cert_path.exists() {
                return Err(anyhow::anyhow!(
                    "Certificate file not found: {}",
                    tls.cert_path.display()
                ));
            }
            if !tls.key_path.exists() {
                return Err(anyhow::anyhow!(
                    "Private key file not found: {}",
                    tls.key_path.display()
                ));
            }

            info!("Loading TLS certificates:");
            info!("  Certificate: {}", tls.cert_path.display());
            info!("  Private key: {}", tls.key_path.display());

            let tls_config = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
                .await
                .map_err(|e| anyhow::anyhow!(
                    "Failed to load TLS certificates: {}\n\nHint: The private key must be in PKCS#8 PEM format. If you have an RSA key, convert it with:\n  openssl pkcs8 -topk8 -inform PEM -outform PEM -nocrypt -in private.key -out key.pem",
                    e
                ))?;

            info!("Interactions endpoint listening on https://0.0.0.0:{}/interactions", config.port);
            axum_server::bind_rustls(addr, tls_config)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            let listener = tokio::net::TcpListener::bind(addr).await?;
            info!(
                "Interactions endpoint listening on http://{}/interactions",
                listener.local_addr()?
            );
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}

/// Health check endpoint
async fn health() -> &'static str {
    "Shift bot interactions endpoint running"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shifts::{create_shared_shift_service, ShiftService};
    use crate::state::{create_shared_token_store, TokenStore};
    use crate::web::followup::FollowupClient;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[test]
    fn test_config_defaults_to_plain_http() {
        let config = WebServerConfig::from_lookup(|_| None);
        assert_eq!(config, WebServerConfig::default());
    }

    #[test]
    fn test_config_reads_port_and_tls() {
        let config = WebServerConfig::from_lookup(|key| match key {
            "INTERACTIONS_PORT" => Some("8443".to_string()),
            "TLS_CERT_PATH" => Some("certs/cert.pem".to_string()),
            "TLS_KEY_PATH" => Some("certs/key.pem".to_string()),
            _ => None,
        });
        assert_eq!(config.port, 8443);
        assert_eq!(
            config.tls,
            Some(TlsPaths {
                cert_path: PathBuf::from("certs/cert.pem"),
                key_path: PathBuf::from("certs/key.pem"),
            })
        );
    }

    #[test]
    fn test_tls_needs_both_paths() {
        let config = WebServerConfig::from_lookup(|key| match key {
            "TLS_CERT_PATH" => Some("certs/cert.pem".to_string()),
            _ => None,
        });
        assert_eq!(config.tls, None);
    }

    #[tokio::test]
    async fn test_health_route() {
        let state = InteractionsState {
            verifier: None,
            shifts: create_shared_shift_service(ShiftService::new(
                None,
                create_shared_token_store(TokenStore::in_memory()),
            )),
            followup: FollowupClient::new("http://127.0.0.1:9"),
        };
        let response = app(state)
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
