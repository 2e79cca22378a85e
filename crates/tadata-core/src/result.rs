use crate::DeployError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tadata_schema::{Deployment, DeploymentResponse, SpecInvalidError};

/// Outcome of a successful deployment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeploymentResult {
    pub id: String,
    /// True when an existing deployment was updated rather than created.
    pub updated: bool,
    /// `None` when the service did not report a creation time.
    pub created_at: Option<DateTime<Utc>>,
    pub deployment: Deployment,
}

impl DeploymentResult {
    /// Interpret a response envelope.
    ///
    /// An envelope with `ok: false` is mapped by its `status` like an HTTP
    /// error; `ok: true` without `data` is an unexpected response format.
    pub fn from_response(response: DeploymentResponse) -> Result<Self, DeployError> {
        let DeploymentResponse {
            ok,
            status,
            data,
            error,
        } = response;

        if !ok {
            let message = error
                .as_ref()
                .map_or_else(|| format!("API error: {status}"), |e| e.message.clone());
            let body = json!({ "ok": false, "status": status, "error": error });
            return Err(if status == 401 || status == 403 {
                DeployError::Auth {
                    message,
                    status,
                    body,
                }
            } else {
                DeployError::Api {
                    message,
                    status,
                    body,
                    source: None,
                }
            });
        }

        let Some(data) = data else {
            return Err(SpecInvalidError::new("Unexpected response format")
                .with_details(json!({ "response": { "ok": ok, "status": status } }))
                .into());
        };

        Ok(Self {
            id: data.deployment.id.clone(),
            updated: data.updated,
            created_at: data.deployment.created_at,
            deployment: data.deployment,
        })
    }
}
