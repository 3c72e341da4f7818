//! Records returned by the PocketBase `users` and `shifts` collections.

use serde::{Deserialize, Deserializer, Serialize};

/// One page of a PocketBase list query
#[derive(Debug, Clone, Deserialize)]
pub struct ListResult<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

/// A staff member, owned by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct UserRecord {
    pub id: String,

    /// Discord snowflake; stored as either a number or a string depending on the schema
    #[serde(default, deserialize_with = "string_or_number")]
    pub discord_user_id: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub role: Option<String>,
}

impl UserRecord {
    /// Display name, falling back to the record id
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.id)
    }

    pub fn role(&self) -> Option<&str> {
        self.role.as_deref().filter(|r| !r.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShiftStatus {
    Active,
    Completed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShiftRecord {
    pub id: String,

    #[serde(default)]
    pub user: String,

    /// PocketBase sends `""` for unset dates
    #[serde(default, deserialize_with = "null_as_empty")]
    pub start_time: String,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub end_time: String,

    pub status: ShiftStatus,

    #[serde(default)]
    pub duration_minutes: Option<i64>,
}

impl ShiftRecord {
    pub fn start_time(&self) -> Option<&str> {
        non_empty(&self.start_time)
    }

    pub fn end_time(&self) -> Option<&str> {
        non_empty(&self.end_time)
    }
}

/// Body of `POST /api/collections/shifts/records`
#[derive(Debug, Serialize)]
pub struct NewShift<'a> {
    pub user: &'a str,
    pub status: ShiftStatus,
}

/// Body of `PATCH /api/collections/shifts/records/:id`
#[derive(Debug, Serialize)]
pub struct CompletedShift<'a> {
    pub end_time: &'a str,
    pub status: ShiftStatus,
    pub duration_minutes: i64,
}

/// Admin login request
#[derive(Serialize)]
pub struct PasswordAuth<'a> {
    pub identity: &'a str,
    pub password: &'a str,
}

/// Admin login response
#[derive(Deserialize)]
pub struct AuthResponse {
    pub token: String,
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
