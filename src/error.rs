use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShiftError {
    // Backend availability
    #[error("The PocketBase integration is not configured. Please contact a bot administrator.")]
    NotConfigured,

    // Identity errors
    #[error("{message}")]
    NotLinked { message: String },

    #[error("{message}")]
    Auth { message: String },

    // Backend errors
    #[error("{message}")]
    Backend { message: String },

    #[error("{message}")]
    Timestamp { message: String },

    // Token store errors
    #[error("Failed to load state from '{path}': {source}")]
    StateLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse state file '{path}': {source}")]
    StateParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to save state to '{path}': {source}")]
    StateSave {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ShiftError {
    pub fn not_linked(message: impl Into<String>) -> Self {
        ShiftError::NotLinked {
            message: message.into(),
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        ShiftError::Auth {
            message: message.into(),
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        ShiftError::Backend {
            message: message.into(),
        }
    }

    pub fn timestamp(message: impl Into<String>) -> Self {
        ShiftError::Timestamp {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for ShiftError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return ShiftError::backend("PocketBase did not respond in time.");
        }
        ShiftError::Backend {
            message: format!("Could not reach PocketBase: {}", err),
        }
    }
}

impl From<serde_json::Error> for ShiftError {
    fn from(err: serde_json::Error) -> Self {
        ShiftError::Backend {
            message: format!("PocketBase returned an unexpected response: {}", err),
        }
    }
}

pub type Result<T> = std::result::Result<T, ShiftError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_configured_message() {
        assert_eq!(
            ShiftError::NotConfigured.to_string(),
            "The PocketBase integration is not configured. Please contact a bot administrator."
        );
    }

    #[test]
    fn test_backend_message_is_verbatim() {
        let err = ShiftError::backend("Failed to create record.");
        assert_eq!(err.to_string(), "Failed to create record.");
    }
}
