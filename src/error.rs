//! Error types for k3sync

use thiserror::Error;

/// Result type alias for k3sync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Operation failed: {0}")]
    Other(String),
}

/// Errors talking to the K3 Cloud API.
///
/// `Clone` so that one in-flight refresh outcome can be handed to every
/// caller waiting on it.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("Authentication rejected by K3 Cloud (HTTP {0}). Check app_id and app_secret.")]
    Unauthorized(u16),

    #[error("Access denied by K3 Cloud (HTTP 403)")]
    Forbidden,

    #[error("Client secret could not be recovered from app_id")]
    MissingSecret,

    #[error("K3 Cloud is not configured: {0}")]
    NotConfigured(String),

    #[error("HTTP error! status: {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    #[error("All {attempted} warehouse queries failed")]
    AllWarehousesFailed { attempted: usize },
}

impl ApiError {
    /// True for failures caused by credentials rather than transport.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            ApiError::Unauthorized(_)
                | ApiError::Forbidden
                | ApiError::MissingSecret
                | ApiError::NotConfigured(_)
        )
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Network("Request timed out".to_string())
        } else if err.is_connect() {
            ApiError::Network("Failed to connect to K3 Cloud".to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found at {0}")]
    NotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("K3 Cloud credential `{0}` is not configured")]
    MissingCredentials(&'static str),
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Local snapshot store errors
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Cache I/O error: {0}")]
    Io(String),

    #[error("Could not determine cache directory")]
    NoHome,

    #[error("Corrupt cache payload: {0}")]
    Corrupt(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_includes_status() {
        let err = ApiError::Http {
            status: 502,
            body: "Bad Gateway".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("502"));
        assert!(msg.contains("Bad Gateway"));
    }

    #[test]
    fn test_unauthorized_includes_status() {
        let err = ApiError::Unauthorized(401);
        assert!(err.to_string().contains("401"));
    }

    #[test]
    fn test_auth_failure_classification() {
        assert!(ApiError::Unauthorized(401).is_auth_failure());
        assert!(ApiError::Forbidden.is_auth_failure());
        assert!(ApiError::MissingSecret.is_auth_failure());
        assert!(!ApiError::Network("timeout".to_string()).is_auth_failure());
        assert!(
            !ApiError::Http {
                status: 500,
                body: String::new()
            }
            .is_auth_failure()
        );
    }

    #[test]
    fn test_all_warehouses_failed_message() {
        let err = ApiError::AllWarehousesFailed { attempted: 9 };
        assert!(err.to_string().contains('9'));
    }

    #[test]
    fn test_api_error_is_clone() {
        let err = ApiError::Network("Connection refused".to_string());
        let copy = err.clone();
        assert_eq!(err.to_string(), copy.to_string());
    }

    #[test]
    fn test_config_error_missing_credentials() {
        let err = ConfigError::MissingCredentials("app_secret");
        assert!(err.to_string().contains("app_secret"));
    }

    #[test]
    fn test_error_from_api_error() {
        let err: Error = ApiError::Forbidden.into();

        match err {
            Error::Api(ApiError::Forbidden) => (),
            _ => panic!("Expected Error::Api(ApiError::Forbidden)"),
        }
    }

    #[test]
    fn test_error_from_cache_error() {
        let err: Error = CacheError::NoHome.into();

        match err {
            Error::Cache(CacheError::NoHome) => (),
            _ => panic!("Expected Error::Cache(CacheError::NoHome)"),
        }
    }

    #[test]
    fn test_config_error_from_yaml_error() {
        let yaml_str = "invalid: [yaml: content";
        let yaml_err = serde_yaml::from_str::<serde_yaml::Value>(yaml_str).unwrap_err();
        let config_err: ConfigError = yaml_err.into();

        match config_err {
            ConfigError::ParseError(_) => (),
            _ => panic!("Expected ConfigError::ParseError"),
        }
    }
}
