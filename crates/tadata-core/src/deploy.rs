use crate::{DeployError, DeploymentResult, InlineSpec, Logger, SpecSource, TracingLogger};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tadata_remote::{
    ApiClient, ApiVersion, ClientConfig, DeploymentTransport, DEFAULT_SERVICE_URL,
    DEFAULT_TIMEOUT, STAGING_SERVICE_URL,
};
use tadata_schema::{AuthConfig, UpsertDeploymentRequest};

/// Inputs of one deployment.
///
/// Exactly one of `spec_path`, `spec_url` and `spec` must be set; this is
/// checked by [`Deployer::deploy`] before anything is read or sent.
#[derive(Debug, Clone)]
pub struct DeployOptions {
    pub spec_path: Option<PathBuf>,
    pub spec_url: Option<String>,
    pub spec: Option<InlineSpec>,
    pub api_key: String,
    /// Base URL of the API the MCP server proxies to.
    pub base_url: Option<String>,
    pub name: Option<String>,
    pub auth_config: Option<AuthConfig>,
    /// Root of the deployment API. Defaults to [`DEFAULT_SERVICE_URL`].
    pub service_url: Option<String>,
    pub api_version: ApiVersion,
    /// Per HTTP request, applied to the spec download and the submission.
    pub timeout: Duration,
    /// Target the staging service, overriding `service_url`.
    pub dev_mode: bool,
}

impl DeployOptions {
    pub fn new(api_key: &str) -> Self {
        Self {
            spec_path: None,
            spec_url: None,
            spec: None,
            api_key: api_key.to_owned(),
            base_url: None,
            name: None,
            auth_config: None,
            service_url: None,
            api_version: ApiVersion::default(),
            timeout: DEFAULT_TIMEOUT,
            dev_mode: false,
        }
    }

    #[must_use]
    pub fn with_spec_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.spec_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_spec_url(mut self, url: &str) -> Self {
        self.spec_url = Some(url.to_owned());
        self
    }

    #[must_use]
    pub fn with_spec(mut self, spec: impl Into<InlineSpec>) -> Self {
        self.spec = Some(spec.into());
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = Some(base_url.to_owned());
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_owned());
        self
    }

    #[must_use]
    pub fn with_auth_config(mut self, auth_config: AuthConfig) -> Self {
        self.auth_config = Some(auth_config);
        self
    }

    #[must_use]
    pub fn with_service_url(mut self, url: &str) -> Self {
        self.service_url = Some(url.to_owned());
        self
    }

    #[must_use]
    pub fn with_api_version(mut self, version: ApiVersion) -> Self {
        self.api_version = version;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_dev_mode(mut self, dev_mode: bool) -> Self {
        self.dev_mode = dev_mode;
        self
    }

    pub fn source(&self) -> Result<SpecSource, DeployError> {
        SpecSource::from_parts(
            self.spec_path.as_deref(),
            self.spec_url.as_deref(),
            self.spec.as_ref(),
        )
    }

    /// Transport settings derived from these options.
    pub fn client_config(&self) -> ClientConfig {
        let service_url = if self.dev_mode {
            STAGING_SERVICE_URL
        } else {
            self.service_url.as_deref().unwrap_or(DEFAULT_SERVICE_URL)
        };
        ClientConfig::new(&self.api_key)
            .with_service_url(service_url)
            .with_api_version(self.api_version)
            .with_timeout(self.timeout)
    }
}

/// Runs deployments with an optional long-lived transport and a logger.
///
/// Without an injected transport, each deployment builds an [`ApiClient`]
/// from [`DeployOptions::client_config`]. An injected transport owns its
/// own service URL, version and timeout.
pub struct Deployer {
    transport: Option<Arc<dyn DeploymentTransport>>,
    logger: Arc<dyn Logger>,
}

impl Default for Deployer {
    fn default() -> Self {
        Self::new()
    }
}

impl Deployer {
    pub fn new() -> Self {
        Self {
            transport: None,
            logger: Arc::new(TracingLogger),
        }
    }

    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn DeploymentTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    #[must_use]
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn deploy(&self, options: &DeployOptions) -> Result<DeploymentResult, DeployError> {
        self.logger.info("Deploying MCP server from OpenAPI spec");

        let source = options.source()?;
        let spec = source.resolve(options.timeout, self.logger.as_ref())?;
        self.logger.debug(&format!(
            "resolved spec '{}' {} ({} paths)",
            spec.info().title,
            spec.info().version,
            spec.paths().len()
        ));

        let request = UpsertDeploymentRequest {
            open_api_spec: spec,
            name: options.name.clone(),
            base_url: options.base_url.clone(),
            auth_config: options.auth_config.clone().unwrap_or_default(),
        };

        let submitted = if let Some(transport) = &self.transport {
            transport.deploy_from_openapi(&request)
        } else {
            let config = options.client_config();
            self.logger
                .debug(&format!("submitting to {}", config.service_url));
            ApiClient::new(config).deploy_from_openapi(&request)
        };
        let response =
            submitted.inspect_err(|e| self.logger.error(&format!("Deployment failed: {e}")))?;

        let result = DeploymentResult::from_response(response)?;
        self.logger.info(&format!(
            "Deployment {} {}",
            result.id,
            if result.updated { "updated" } else { "created" }
        ));
        Ok(result)
    }
}

/// Deploy with a default [`Deployer`].
pub fn deploy(options: &DeployOptions) -> Result<DeploymentResult, DeployError> {
    Deployer::new().deploy(options)
}
