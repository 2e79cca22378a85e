//! HTTP transport for the Tadata deployment API.
//!
//! This crate submits deployment requests (`ApiClient`), maps HTTP and
//! transport failures onto `RemoteError`, fetches remote OpenAPI documents
//! (`fetch_document`), and holds client configuration and the on-disk
//! credentials file.

pub mod config;
pub mod http;

pub use config::{
    default_credentials_path, ClientConfig, ConfigError, Credentials, DEFAULT_SERVICE_URL,
    DEFAULT_TIMEOUT, STAGING_SERVICE_URL,
};
pub use http::{build_agent, fetch_document, ApiClient, FetchedDocument, DEPLOY_PATH};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tadata_schema::{DeploymentResponse, UpsertDeploymentRequest};
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum RemoteError {
    /// No HTTP response was obtained (DNS, connect, TLS, timeout, body read).
    #[error("{message}")]
    Network {
        message: String,
        #[source]
        source: BoxError,
    },
    /// The service answered 401 or 403.
    #[error("{message}")]
    Auth {
        message: String,
        status: u16,
        body: Value,
    },
    /// Any other error status, or a success body that could not be decoded.
    #[error("{message}")]
    Api {
        message: String,
        status: u16,
        body: Value,
        #[source]
        source: Option<BoxError>,
    },
}

impl RemoteError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Network { .. } => None,
            Self::Auth { status, .. } | Self::Api { status, .. } => Some(*status),
        }
    }
}

/// Version token sent as the `x-api-version` header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiVersion {
    #[serde(rename = "05-2025")]
    V05_2025,
    #[default]
    #[serde(rename = "latest")]
    Latest,
}

impl ApiVersion {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::V05_2025 => "05-2025",
            Self::Latest => "latest",
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApiVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "05-2025" => Ok(Self::V05_2025),
            "latest" => Ok(Self::Latest),
            other => Err(format!(
                "unknown API version '{other}', expected '05-2025' or 'latest'"
            )),
        }
    }
}

/// Anything that can submit a deployment request to the service.
pub trait DeploymentTransport: Send + Sync {
    /// Submit one upsert request. Error statuses are returned as `Err`.
    fn deploy_from_openapi(
        &self,
        request: &UpsertDeploymentRequest,
    ) -> Result<DeploymentResponse, RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_version_string_forms() {
        assert_eq!(ApiVersion::default(), ApiVersion::Latest);
        assert_eq!(ApiVersion::V05_2025.to_string(), "05-2025");
        assert_eq!("latest".parse::<ApiVersion>(), Ok(ApiVersion::Latest));
        assert_eq!("05-2025".parse::<ApiVersion>(), Ok(ApiVersion::V05_2025));
        assert!("2024".parse::<ApiVersion>().is_err());
    }

    #[test]
    fn api_version_serde_matches_header_value() {
        let json = serde_json::to_string(&ApiVersion::V05_2025).unwrap();
        assert_eq!(json, "\"05-2025\"");
    }

    #[test]
    fn remote_error_status() {
        let err = RemoteError::Auth {
            message: "denied".to_owned(),
            status: 403,
            body: Value::Null,
        };
        assert_eq!(err.status(), Some(403));
        assert_eq!(err.to_string(), "denied");

        let err = RemoteError::Network {
            message: "down".to_owned(),
            source: "refused".into(),
        };
        assert_eq!(err.status(), None);
    }
}
