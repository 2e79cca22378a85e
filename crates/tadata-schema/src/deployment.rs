use crate::OpenApiSpec;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Which client-supplied credentials the deployed MCP server forwards to the
/// upstream API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    #[serde(default = "default_pass_headers")]
    pub pass_headers: Vec<String>,
    #[serde(default = "default_pass_query_params")]
    pub pass_query_params: Vec<String>,
    #[serde(default)]
    pub pass_json_body_params: Vec<String>,
    #[serde(default)]
    pub pass_form_data_params: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            pass_headers: default_pass_headers(),
            pass_query_params: default_pass_query_params(),
            pass_json_body_params: Vec::new(),
            pass_form_data_params: Vec::new(),
        }
    }
}

impl AuthConfig {
    #[must_use]
    pub fn with_pass_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pass_headers = headers.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_pass_query_params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pass_query_params = params.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_pass_json_body_params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pass_json_body_params = params.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_pass_form_data_params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pass_form_data_params = params.into_iter().map(Into::into).collect();
        self
    }
}

fn default_pass_headers() -> Vec<String> {
    [
        "authorization",
        "api-key",
        "api_key",
        "apikey",
        "x-api-key",
        "x-apikey",
    ]
    .map(str::to_owned)
    .to_vec()
}

fn default_pass_query_params() -> Vec<String> {
    ["api-key", "api_key", "apikey"].map(str::to_owned).to_vec()
}

/// Body of `POST /api/deployments/from-openapi`.
///
/// `name` and `baseUrl` are left out of the payload when unset; the auth
/// lists are always sent, even when empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertDeploymentRequest {
    pub open_api_spec: OpenApiSpec,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub auth_config: AuthConfig,
}

impl UpsertDeploymentRequest {
    pub fn new(open_api_spec: OpenApiSpec) -> Self {
        Self {
            open_api_spec,
            name: None,
            base_url: None,
            auth_config: AuthConfig::default(),
        }
    }
}

/// Machine-readable error codes returned by the deployment API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    ServiceValidationError,
    JsonParseError,
    InvalidContentType,
    AuthError,
    NotFound,
    InternalError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// A deployment record as reported by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub id: String,
    /// Offset-less timestamps are read as UTC; unparseable ones as `None`.
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcp_server_id: Option<String>,
    #[serde(
        default,
        rename = "openAPISpecHash",
        skip_serializing_if = "Option::is_none"
    )]
    pub open_api_spec_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcp_spec_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(text) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if let Ok(ts) = DateTime::parse_from_rfc3339(&text) {
        return Ok(Some(ts.with_timezone(&Utc)));
    }
    Ok(["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&text, fmt).ok())
        .map(|naive| naive.and_utc()))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpsertDeploymentData {
    pub updated: bool,
    pub deployment: Deployment,
}

/// Envelope wrapping every response of the deployment API.
///
/// `data` is meaningful when `ok` is true, `error` when it is false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeploymentResponse {
    pub ok: bool,
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<UpsertDeploymentData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiErrorBody>,
}
