use crate::{DeployError, Logger};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tadata_remote::{build_agent, fetch_document};
use tadata_schema::{OpenApiSpec, SpecFormat, SpecInvalidError};

const MISSING_SOURCE: &str = "One of spec_path, spec_url, or spec must be provided";
const CONFLICTING_SOURCES: &str = "Only one of spec_path, spec_url, or spec should be provided";

/// An OpenAPI document handed over in memory.
#[derive(Debug, Clone, PartialEq)]
pub enum InlineSpec {
    /// Raw mapping, validated when the deployment runs.
    Mapping(Value),
    /// Already validated.
    Parsed(OpenApiSpec),
}

impl From<Value> for InlineSpec {
    fn from(value: Value) -> Self {
        Self::Mapping(value)
    }
}

impl From<OpenApiSpec> for InlineSpec {
    fn from(spec: OpenApiSpec) -> Self {
        Self::Parsed(spec)
    }
}

/// Where the document to deploy comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum SpecSource {
    Path(PathBuf),
    Url(String),
    Inline(InlineSpec),
}

impl SpecSource {
    /// Pick the single source among the optional inputs. Zero or several
    /// sources is an `InvalidArgument`; nothing is read before this check.
    pub fn from_parts(
        path: Option<&Path>,
        url: Option<&str>,
        inline: Option<&InlineSpec>,
    ) -> Result<Self, DeployError> {
        match (path, url, inline) {
            (None, None, None) => Err(DeployError::InvalidArgument(MISSING_SOURCE.to_owned())),
            (Some(path), None, None) => Ok(Self::Path(path.to_path_buf())),
            (None, Some(url), None) => Ok(Self::Url(url.to_owned())),
            (None, None, Some(spec)) => Ok(Self::Inline(spec.clone())),
            _ => Err(DeployError::InvalidArgument(
                CONFLICTING_SOURCES.to_owned(),
            )),
        }
    }

    /// Load and validate the document. `timeout` bounds the URL fetch.
    pub fn resolve(
        &self,
        timeout: Duration,
        logger: &dyn Logger,
    ) -> Result<OpenApiSpec, DeployError> {
        match self {
            Self::Path(path) => {
                logger.info(&format!("Loading OpenAPI spec from file: {}", path.display()));
                Ok(OpenApiSpec::from_file(path)?)
            }
            Self::Url(url) => {
                logger.info(&format!("Loading OpenAPI spec from URL: {url}"));
                fetch_spec(url, timeout)
            }
            Self::Inline(InlineSpec::Mapping(value)) => {
                logger.info("Using provided OpenAPI spec mapping");
                Ok(OpenApiSpec::from_value(value.clone())?)
            }
            Self::Inline(InlineSpec::Parsed(spec)) => {
                logger.info("Using provided OpenAPI spec");
                Ok(spec.clone())
            }
        }
    }
}

fn fetch_spec(url: &str, timeout: Duration) -> Result<OpenApiSpec, DeployError> {
    let agent = build_agent(timeout);
    let document = fetch_document(&agent, url).map_err(|e| {
        SpecInvalidError::new(format!("Failed to fetch OpenAPI spec from URL: {e}"))
            .with_details(json!({ "url": url }))
            .with_source(e)
    })?;
    let format = detect_format(document.content_type.as_deref(), url);
    Ok(format.parse(&document.body)?)
}

/// Choose a parser for a downloaded document: the content type wins, then
/// the extension of the URL path, then JSON.
pub fn detect_format(content_type: Option<&str>, url: &str) -> SpecFormat {
    let content_type = content_type.unwrap_or_default().to_ascii_lowercase();
    if content_type.contains("json") {
        return SpecFormat::Json;
    }
    if content_type.contains("yaml") || content_type.contains("yml") {
        return SpecFormat::Yaml;
    }

    let path = match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_owned(),
        Err(_) => url.split(['?', '#']).next().unwrap_or(url).to_owned(),
    };
    SpecFormat::from_path(Path::new(&path)).unwrap_or(SpecFormat::Json)
}
