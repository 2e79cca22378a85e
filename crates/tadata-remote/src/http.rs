use crate::{BoxError, ClientConfig, DeploymentTransport, RemoteError};
use serde_json::{json, Value};
use std::fmt::Display;
use std::io::Read;
use std::time::Duration;
use tadata_schema::{DeploymentResponse, UpsertDeploymentRequest};
use tracing::{debug, error, info};

pub const DEPLOY_PATH: &str = "/api/deployments/from-openapi";

/// Build an agent that applies `timeout` to each request and hands error
/// statuses back as ordinary responses.
pub fn build_agent(timeout: Duration) -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build();
    ureq::Agent::new_with_config(config)
}

/// Client for the deployment API.
///
/// Every request carries:
/// - `?apiKey=<key>` query parameter
/// - `Content-Type` / `Accept: application/json`
/// - `x-api-version: <version>`
pub struct ApiClient {
    config: ClientConfig,
    agent: ureq::Agent,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Self {
        let agent = build_agent(config.timeout);
        Self { config, agent }
    }

    /// Use a caller-owned agent, e.g. one shared across many deployments.
    ///
    /// The agent must be built with `http_status_as_error(false)`, as
    /// [`build_agent`] does, or error bodies are lost.
    pub fn with_agent(config: ClientConfig, agent: ureq::Agent) -> Self {
        Self { config, agent }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.service_url)
    }

    fn post_json(
        &self,
        path: &str,
        payload: &impl serde::Serialize,
    ) -> Result<RawResponse, RemoteError> {
        let url = self.url(path);
        debug!("POST {url}");
        let response = self
            .agent
            .post(url.as_str())
            .query("apiKey", &self.config.api_key)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .header("x-api-version", self.config.api_version.as_str())
            .send_json(payload)
            .map_err(|e| network_error("Network error occurred", e))?;
        let raw = RawResponse::read(response)?;

        if raw.status >= 400 {
            return Err(status_error(raw.status, &raw.body));
        }
        Ok(raw)
    }
}

impl DeploymentTransport for ApiClient {
    fn deploy_from_openapi(
        &self,
        request: &UpsertDeploymentRequest,
    ) -> Result<DeploymentResponse, RemoteError> {
        info!("deploying MCP server from OpenAPI spec");
        let raw = self.post_json(DEPLOY_PATH, request)?;

        serde_json::from_str(&raw.body).map_err(|e| {
            error!("failed to parse deployment response: {e}");
            RemoteError::Api {
                message: "Failed to parse deployment response".to_owned(),
                status: raw.status,
                body: parse_body(&raw.body),
                source: Some(Box::new(e)),
            }
        })
    }
}

/// A document downloaded with [`fetch_document`].
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

/// GET `url` with the agent's timeout. Error statuses are failures.
pub fn fetch_document(agent: &ureq::Agent, url: &str) -> Result<FetchedDocument, RemoteError> {
    debug!("GET {url}");
    let response = agent
        .get(url)
        .call()
        .map_err(|e| network_error("Network error occurred", e))?;
    let raw = RawResponse::read(response)?;

    if raw.status >= 400 {
        return Err(RemoteError::Api {
            message: format!("HTTP {} for {url}", raw.status),
            status: raw.status,
            body: parse_body(&raw.body),
            source: None,
        });
    }
    Ok(FetchedDocument {
        status: raw.status,
        content_type: raw.content_type,
        body: raw.body,
    })
}

struct RawResponse {
    status: u16,
    content_type: Option<String>,
    body: String,
}

impl RawResponse {
    fn read(response: ureq::http::Response<ureq::Body>) -> Result<Self, RemoteError> {
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let mut reader = response.into_body().into_reader();
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| network_error("Failed to read response body", e))?;

        Ok(Self {
            status,
            content_type,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

fn network_error<E>(context: &str, e: E) -> RemoteError
where
    E: Into<BoxError> + Display,
{
    error!("request error: {e}");
    RemoteError::Network {
        message: format!("{context}: {e}"),
        source: e.into(),
    }
}

/// Best-effort decoding of a response body: JSON when it parses, otherwise
/// the raw text under `"body"`.
fn parse_body(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| json!({ "body": text }))
}

fn status_error(status: u16, text: &str) -> RemoteError {
    let fallback = format!("API error: {status}");
    let (message, body) = match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => {
            let message = map
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .map_or(fallback, str::to_owned);
            (message, Value::Object(map))
        }
        Ok(other) => (fallback, json!({ "body": other })),
        Err(_) => (fallback, json!({ "body": text })),
    };

    if status == 401 || status == 403 {
        error!("authentication error: {status}");
        RemoteError::Auth {
            message,
            status,
            body,
        }
    } else {
        error!("API error: {status} - {message}");
        RemoteError::Api {
            message,
            status,
            body,
            source: None,
        }
    }
}
