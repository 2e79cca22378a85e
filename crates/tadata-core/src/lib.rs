//! Deployment orchestration for Tadata.
//!
//! This crate ties together spec loading and the HTTP transport into
//! `deploy` / `Deployer`: the single entry point that checks exactly one spec
//! source was given, resolves it into a validated `OpenApiSpec`, builds the
//! upsert request, submits it once, and maps the reply into a
//! `DeploymentResult`. All failures surface as `DeployError`.

pub mod deploy;
pub mod logger;
pub mod result;
pub mod source;

pub use deploy::{deploy, DeployOptions, Deployer};
pub use logger::{Logger, TracingLogger};
pub use result::DeploymentResult;
pub use source::{detect_format, InlineSpec, SpecSource};

pub use tadata_remote::{ApiVersion, DeploymentTransport};
pub use tadata_schema::{AuthConfig, OpenApiSpec, SpecInvalidError};

use serde_json::Value;
use tadata_remote::{BoxError, RemoteError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("{0}")]
    InvalidArgument(String),
    #[error(transparent)]
    SpecInvalid(#[from] SpecInvalidError),
    #[error("{message}")]
    Auth {
        message: String,
        status: u16,
        body: Value,
    },
    #[error("{message}")]
    Api {
        message: String,
        status: u16,
        body: Value,
        #[source]
        source: Option<BoxError>,
    },
    #[error("{message}")]
    Network {
        message: String,
        #[source]
        source: BoxError,
    },
}

/// The closed set of failure kinds a deployment can end in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    SpecInvalid,
    Auth,
    Api,
    Network,
}

impl ErrorKind {
    /// Stable machine-readable code.
    pub fn code(self) -> &'static str {
        match self {
            Self::InvalidArgument => "invalid_argument",
            Self::SpecInvalid => "spec_invalid",
            Self::Auth => "auth_error",
            Self::Api => "api_error",
            Self::Network => "network_error",
        }
    }
}

impl DeployError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::SpecInvalid(_) => ErrorKind::SpecInvalid,
            Self::Auth { .. } => ErrorKind::Auth,
            Self::Api { .. } => ErrorKind::Api,
            Self::Network { .. } => ErrorKind::Network,
        }
    }

    pub fn code(&self) -> &'static str {
        self.kind().code()
    }

    /// HTTP status associated with the failure, if any. Invalid specs report
    /// 400 even though no request was sent.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::InvalidArgument(_) | Self::Network { .. } => None,
            Self::SpecInvalid(_) => Some(400),
            Self::Auth { status, .. } | Self::Api { status, .. } => Some(*status),
        }
    }

    /// Structured context: the offending input for spec errors, the response
    /// body for service errors.
    pub fn details(&self) -> Option<&Value> {
        match self {
            Self::SpecInvalid(e) => e.details(),
            Self::Auth { body, .. } | Self::Api { body, .. } => Some(body),
            Self::InvalidArgument(_) | Self::Network { .. } => None,
        }
    }
}

impl From<RemoteError> for DeployError {
    fn from(e: RemoteError) -> Self {
        match e {
            RemoteError::Network { message, source } => Self::Network { message, source },
            RemoteError::Auth {
                message,
                status,
                body,
            } => Self::Auth {
                message,
                status,
                body,
            },
            RemoteError::Api {
                message,
                status,
                body,
                source,
            } => Self::Api {
                message,
                status,
                body,
                source,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn codes_are_distinct() {
        let kinds = [
            ErrorKind::InvalidArgument,
            ErrorKind::SpecInvalid,
            ErrorKind::Auth,
            ErrorKind::Api,
            ErrorKind::Network,
        ];
        let mut codes: Vec<_> = kinds.into_iter().map(ErrorKind::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), kinds.len());
    }

    #[test]
    fn remote_errors_keep_their_kind() {
        let auth: DeployError = RemoteError::Auth {
            message: "Invalid API key".to_owned(),
            status: 403,
            body: json!({}),
        }
        .into();
        assert_eq!(auth.kind(), ErrorKind::Auth);
        assert_eq!(auth.status_code(), Some(403));
        assert_eq!(auth.to_string(), "Invalid API key");

        let network: DeployError = RemoteError::Network {
            message: "Network error occurred: refused".to_owned(),
            source: "refused".into(),
        }
        .into();
        assert_eq!(network.code(), "network_error");
        assert_eq!(network.status_code(), None);
        assert!(std::error::Error::source(&network).is_some());
    }

    #[test]
    fn spec_invalid_is_transparent() {
        let err: DeployError = SpecInvalidError::new("Invalid JSON: eof")
            .with_details(json!({"json_str": "{"}))
            .into();
        assert_eq!(err.to_string(), "Invalid JSON: eof");
        assert_eq!(err.code(), "spec_invalid");
        assert_eq!(err.status_code(), Some(400));
        assert_eq!(err.details().unwrap()["json_str"], "{");
    }
}
