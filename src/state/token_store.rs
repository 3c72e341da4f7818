use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{Result, ShiftError};

/// PocketBase auth keys linked to Discord users with `/login`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedAccounts {
    /// Schema version
    pub version: u32,

    /// Last update timestamp
    pub last_updated: u64,

    /// Map of Discord ID (as string) to linked account
    pub accounts: HashMap<String, LinkedAccount>,
}

impl Default for LinkedAccounts {
    fn default() -> Self {
        Self {
            version: 1,
            last_updated: current_timestamp(),
            accounts: HashMap::new(),
        }
    }
}

impl LinkedAccounts {
    /// Load from a JSON file, or create new if not exists
    pub async fn load(path: &Path) -> Result<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => serde_json::from_str(&content).map_err(|e| ShiftError::StateParse {
                path: path.display().to_string(),
                source: e,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ShiftError::StateLoad {
                path: path.display().to_string(),
                source: e,
            }),
        }
    }

    /// Save to a JSON file atomically
    pub async fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).map_err(|e| ShiftError::StateParse {
            path: path.display().to_string(),
            source: e,
        })?;

        // Write to temp file first, then rename for atomicity
        let temp_path = path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, &content)
            .await
            .map_err(|e| ShiftError::StateSave {
                path: path.display().to_string(),
                source: e,
            })?;

        tokio::fs::rename(&temp_path, path)
            .await
            .map_err(|e| ShiftError::StateSave {
                path: path.display().to_string(),
                source: e,
            })?;

        Ok(())
    }
}

/// A Discord user's linked PocketBase key
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinkedAccount {
    /// Discord user ID (snowflake as string)
    pub discord_id: String,

    /// PocketBase auth key, forwarded as a bearer token
    pub token: String,

    /// PocketBase record id of the linked user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pocketbase_user_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// When the key was linked (Unix timestamp)
    pub linked_at: u64,
}

impl LinkedAccount {
    pub fn new(discord_id: u64, token: String) -> Self {
        Self {
            discord_id: discord_id.to_string(),
            token,
            pocketbase_user_id: None,
            display_name: None,
            linked_at: current_timestamp(),
        }
    }
}

/// Per-user credential store. Every change is written through to disk when a
/// path is configured.
pub struct TokenStore {
    path: Option<PathBuf>,
    accounts: RwLock<LinkedAccounts>,
}

impl TokenStore {
    /// Store that only lives in memory
    pub fn in_memory() -> Self {
        Self {
            path: None,
            accounts: RwLock::new(LinkedAccounts::default()),
        }
    }

    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let accounts = LinkedAccounts::load(&path).await?;
        info!(
            "Loaded {} linked account(s) from {}",
            accounts.accounts.len(),
            path.display()
        );
        Ok(Self {
            path: Some(path),
            accounts: RwLock::new(accounts),
        })
    }

    pub async fn get(&self, discord_id: u64) -> Option<String> {
        let accounts = self.accounts.read().await;
        accounts
            .accounts
            .get(&discord_id.to_string())
            .map(|a| a.token.clone())
    }

    pub async fn account(&self, discord_id: u64) -> Option<LinkedAccount> {
        let accounts = self.accounts.read().await;
        accounts.accounts.get(&discord_id.to_string()).cloned()
    }

    pub async fn set(&self, account: LinkedAccount) -> Result<()> {
        let mut accounts = self.accounts.write().await;
        debug!("Linking PocketBase key for Discord user {}", account.discord_id);
        accounts.accounts.insert(account.discord_id.clone(), account);
        accounts.last_updated = current_timestamp();
        self.persist(&accounts).await
    }

    /// Remove a user's key. Returns whether one was stored.
    pub async fn clear(&self, discord_id: u64) -> Result<bool> {
        let mut accounts = self.accounts.write().await;
        let removed = accounts.accounts.remove(&discord_id.to_string()).is_some();
        if removed {
            debug!("Cleared PocketBase key for Discord user {}", discord_id);
            accounts.last_updated = current_timestamp();
            self.persist(&accounts).await?;
        }
        Ok(removed)
    }

    async fn persist(&self, accounts: &LinkedAccounts) -> Result<()> {
        match &self.path {
            Some(path) => accounts.save(path).await,
            None => Ok(()),
        }
    }
}

/// Shared token store type
pub type SharedTokenStore = Arc<TokenStore>;

pub fn create_shared_token_store(store: TokenStore) -> SharedTokenStore {
    Arc::new(store)
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
