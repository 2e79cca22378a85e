use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Characters of unparseable input kept in error details.
const SNIPPET_CHARS: usize = 100;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// An OpenAPI document could not be loaded or failed structural validation.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct SpecInvalidError {
    message: String,
    details: Option<Value>,
    #[source]
    source: Option<BoxError>,
}

impl SpecInvalidError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: None,
            source: None,
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The offending input, or the path/URL it came from.
    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }
}

/// The `info` object of an OpenAPI document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    pub title: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

#[derive(Deserialize)]
struct RawSpec {
    openapi: String,
    info: Info,
    paths: Map<String, Value>,
    #[serde(flatten)]
    extensions: Map<String, Value>,
}

/// A structurally validated OpenAPI 3.x document.
///
/// Only `openapi`, `info` and the presence of `paths` are checked. Every other
/// top-level key is kept in [`OpenApiSpec::extensions`] and serialized back
/// unchanged, so the document sent upstream is the document that was loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenApiSpec {
    openapi: String,
    info: Info,
    paths: Map<String, Value>,
    #[serde(flatten)]
    extensions: Map<String, Value>,
}

impl OpenApiSpec {
    pub fn from_value(data: Value) -> Result<Self, SpecInvalidError> {
        let raw = match RawSpec::deserialize(&data) {
            Ok(raw) => raw,
            Err(e) => {
                return Err(
                    SpecInvalidError::new(format!("Invalid OpenAPI specification: {e}"))
                        .with_details(data)
                        .with_source(e),
                );
            }
        };

        if !raw.openapi.starts_with("3.") {
            return Err(SpecInvalidError::new(
                "Invalid OpenAPI specification: Only OpenAPI 3.x specifications are supported",
            )
            .with_details(data));
        }

        Ok(Self {
            openapi: raw.openapi,
            info: raw.info,
            paths: raw.paths,
            extensions: raw.extensions,
        })
    }

    pub fn from_json(text: &str) -> Result<Self, SpecInvalidError> {
        let data: Value = serde_json::from_str(text).map_err(|e| {
            SpecInvalidError::new(format!("Invalid JSON: {e}"))
                .with_details(json!({ "json_str": snippet(text) }))
                .with_source(e)
        })?;
        Self::from_value(data)
    }

    pub fn from_yaml(text: &str) -> Result<Self, SpecInvalidError> {
        let invalid = |message: String| {
            SpecInvalidError::new(format!("Invalid YAML: {message}"))
                .with_details(json!({ "yaml_str": snippet(text) }))
        };
        let mut document: serde_yaml::Value =
            serde_yaml::from_str(text).map_err(|e| invalid(e.to_string()).with_source(e))?;
        // `<<: *anchor` merge keys, as YAML 1.1 loaders resolve them.
        document
            .apply_merge()
            .map_err(|e| invalid(e.to_string()).with_source(e))?;
        let data = yaml_to_json(document).map_err(invalid)?;
        Self::from_value(data)
    }

    /// Load a document from disk. The parser is chosen by extension:
    /// `.json`, `.yaml` or `.yml` (case-insensitive).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SpecInvalidError> {
        let path = path.as_ref();
        let resolved = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        let file_details = || json!({ "file_path": resolved.display().to_string() });

        let content = fs::read_to_string(&resolved).map_err(|e| {
            SpecInvalidError::new(format!("Failed to read file: {e}"))
                .with_details(file_details())
                .with_source(e)
        })?;

        let Some(format) = SpecFormat::from_path(&resolved) else {
            let ext = resolved
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_default();
            return Err(SpecInvalidError::new(format!(
                "Unsupported file extension: {ext}. Only .json, .yaml, and .yml files are supported."
            ))
            .with_details(file_details()));
        };
        format.parse(&content)
    }

    pub fn openapi(&self) -> &str {
        &self.openapi
    }

    pub fn info(&self) -> &Info {
        &self.info
    }

    pub fn paths(&self) -> &Map<String, Value> {
        &self.paths
    }

    /// Top-level keys other than `openapi`, `info` and `paths`.
    pub fn extensions(&self) -> &Map<String, Value> {
        &self.extensions
    }

    /// The document as a JSON mapping, in the shape it was loaded from.
    pub fn to_value(&self) -> Value {
        let mut info = self.info.extensions.clone();
        info.insert("title".to_owned(), Value::from(self.info.title.as_str()));
        info.insert("version".to_owned(), Value::from(self.info.version.as_str()));
        if let Some(description) = &self.info.description {
            info.insert("description".to_owned(), Value::from(description.as_str()));
        }

        let mut doc = self.extensions.clone();
        doc.insert("openapi".to_owned(), Value::from(self.openapi.as_str()));
        doc.insert("info".to_owned(), Value::Object(info));
        doc.insert("paths".to_owned(), Value::Object(self.paths.clone()));
        Value::Object(doc)
    }
}

impl TryFrom<Value> for OpenApiSpec {
    type Error = SpecInvalidError;

    fn try_from(data: Value) -> Result<Self, Self::Error> {
        Self::from_value(data)
    }
}

/// Text encodings an OpenAPI document may arrive in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecFormat {
    Json,
    Yaml,
}

impl SpecFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    pub fn parse(self, text: &str) -> Result<OpenApiSpec, SpecInvalidError> {
        match self {
            Self::Json => OpenApiSpec::from_json(text),
            Self::Yaml => OpenApiSpec::from_yaml(text),
        }
    }
}

fn snippet(text: &str) -> String {
    text.chars().take(SNIPPET_CHARS).collect()
}

// YAML allows non-string keys (`200:` under `responses`); JSON objects do not.
fn yaml_to_json(value: serde_yaml::Value) -> Result<Value, String> {
    use serde_yaml::Value as Yaml;

    Ok(match value {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => yaml_number(&n),
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(items) => Value::Array(
            items
                .into_iter()
                .map(yaml_to_json)
                .collect::<Result<_, _>>()?,
        ),
        Yaml::Mapping(mapping) => {
            let mut object = Map::new();
            for (key, value) in mapping {
                object.insert(yaml_key(key)?, yaml_to_json(value)?);
            }
            Value::Object(object)
        }
        Yaml::Tagged(tagged) => yaml_to_json(tagged.value)?,
    })
}

fn yaml_number(n: &serde_yaml::Number) -> Value {
    if let Some(i) = n.as_i64() {
        Value::from(i)
    } else if let Some(u) = n.as_u64() {
        Value::from(u)
    } else {
        n.as_f64()
            .and_then(serde_json::Number::from_f64)
            .map_or(Value::Null, Value::Number)
    }
}

fn yaml_key(key: serde_yaml::Value) -> Result<String, String> {
    use serde_yaml::Value as Yaml;

    match key {
        Yaml::String(s) => Ok(s),
        Yaml::Number(n) => Ok(n.to_string()),
        Yaml::Bool(b) => Ok(b.to_string()),
        Yaml::Null => Ok("null".to_owned()),
        Yaml::Tagged(tagged) => yaml_key(tagged.value),
        Yaml::Sequence(_) | Yaml::Mapping(_) => {
            Err("mapping keys must be scalars".to_owned())
        }
    }
}
