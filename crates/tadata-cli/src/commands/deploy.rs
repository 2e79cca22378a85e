use super::{colorize_outcome, json_pretty, report_error, API_KEY_ENV, EXIT_SUCCESS};
use crate::DeployArgs;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use std::time::Duration;
use tadata_core::{AuthConfig, DeployError, DeployOptions, Deployer, DeploymentResult};
use tadata_remote::{ConfigError, Credentials};
use tracing::{debug, warn};

/// Stored credentials, if any. A missing file is not an error.
fn load_credentials() -> Option<Credentials> {
    match Credentials::load_default() {
        Ok(creds) => Some(creds),
        Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            warn!("ignoring stored credentials: {e}");
            None
        }
    }
}

/// Flag, then environment, then credentials file.
fn resolve_api_key(
    flag: Option<&str>,
    env: Option<String>,
    creds: Option<&Credentials>,
) -> Option<String> {
    flag.map(str::to_owned)
        .or(env.filter(|k| !k.is_empty()))
        .or_else(|| creds.map(|c| c.api_key.clone()))
}

/// `None` when no pass-through flag was given, so the defaults apply.
fn auth_config(args: &DeployArgs) -> Option<AuthConfig> {
    if args.pass_headers.is_empty()
        && args.pass_query_params.is_empty()
        && args.pass_json_body_params.is_empty()
        && args.pass_form_data_params.is_empty()
    {
        return None;
    }
    let mut config = AuthConfig::default();
    if !args.pass_headers.is_empty() {
        config = config.with_pass_headers(args.pass_headers.iter().cloned());
    }
    if !args.pass_query_params.is_empty() {
        config = config.with_pass_query_params(args.pass_query_params.iter().cloned());
    }
    Some(
        config
            .with_pass_json_body_params(args.pass_json_body_params.iter().cloned())
            .with_pass_form_data_params(args.pass_form_data_params.iter().cloned()),
    )
}

fn build_options(args: &DeployArgs, api_key: &str, creds: Option<&Credentials>) -> DeployOptions {
    let mut options = DeployOptions::new(api_key)
        .with_api_version(args.api_version)
        .with_timeout(Duration::from_secs(args.timeout))
        .with_dev_mode(args.dev);
    options.spec_path.clone_from(&args.file);
    options.spec_url.clone_from(&args.url);
    options.base_url.clone_from(&args.base_url);
    options.name.clone_from(&args.name);
    options.auth_config = auth_config(args);
    options.service_url = args
        .service_url
        .clone()
        .or_else(|| creds.and_then(|c| c.service_url.clone()));
    options
}

/// Spinner on stderr while the deployment is in flight. Hidden with `--json`.
struct Progress(Option<ProgressBar>);

impl Progress {
    fn start(json: bool, options: &DeployOptions) -> Self {
        Self((!json).then(|| {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
                pb.set_style(style);
            }
            let target = options.name.as_deref().unwrap_or("MCP server");
            pb.set_message(format!("deploying {target}…"));
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        }))
    }

    fn finish(self, outcome: &Result<DeploymentResult, DeployError>) {
        let Some(pb) = self.0 else { return };
        if let Ok(style) = ProgressStyle::with_template("{msg}") {
            pb.set_style(style);
        }
        pb.finish_with_message(match outcome {
            Ok(result) => format!("✓ {} {}", colorize_outcome(result.updated), result.id),
            Err(e) => format!("✗ deployment failed ({})", e.code()),
        });
    }
}

pub fn run(args: &DeployArgs, json: bool) -> Result<u8, String> {
    let creds = load_credentials();
    let api_key = resolve_api_key(
        args.api_key.as_deref(),
        std::env::var(API_KEY_ENV).ok(),
        creds.as_ref(),
    )
    .ok_or_else(|| {
        format!("no API key: pass --api-key, set {API_KEY_ENV}, or run 'tadata configure'")
    })?;
    let options = build_options(args, &api_key, creds.as_ref());
    debug!(
        "deploying with service URL {}",
        options.client_config().service_url
    );

    let progress = Progress::start(json, &options);
    let outcome = Deployer::new().deploy(&options);
    progress.finish(&outcome);
    let result = match outcome {
        Ok(result) => result,
        Err(e) => return report_error(&e, json),
    };

    if json {
        let payload = json!({
            "ok": true,
            "id": result.id,
            "updated": result.updated,
            "createdAt": result.created_at,
            "deployment": result.deployment,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("{} deployment {}", colorize_outcome(result.updated), result.id);
        if let Some(created_at) = result.created_at {
            println!("created at {}", created_at.to_rfc3339());
        }
        if let Some(server) = &result.deployment.mcp_server_id {
            println!("MCP server {server}");
        }
    }
    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: DeployArgs,
    }

    fn parse(argv: &[&str]) -> DeployArgs {
        Wrapper::parse_from(std::iter::once("deploy").chain(argv.iter().copied())).args
    }

    #[test]
    fn api_key_precedence() {
        let creds = Credentials::new("from-file");
        assert_eq!(
            resolve_api_key(Some("flag"), Some("env".to_owned()), Some(&creds)).as_deref(),
            Some("flag")
        );
        assert_eq!(
            resolve_api_key(None, Some("env".to_owned()), Some(&creds)).as_deref(),
            Some("env")
        );
        assert_eq!(
            resolve_api_key(None, Some(String::new()), Some(&creds)).as_deref(),
            Some("from-file")
        );
        assert_eq!(resolve_api_key(None, None, None), None);
    }

    #[test]
    fn no_pass_flags_leaves_defaults_to_core() {
        let args = parse(&["--file", "openapi.yaml"]);
        assert!(auth_config(&args).is_none());
    }

    #[test]
    fn pass_header_replaces_only_headers() {
        let args = parse(&[
            "--file",
            "openapi.yaml",
            "--pass-header",
            "x-one",
            "--pass-header",
            "x-two",
            "--pass-json-body-param",
            "token",
        ]);
        let config = auth_config(&args).unwrap();
        assert_eq!(config.pass_headers, ["x-one", "x-two"]);
        assert_eq!(
            config.pass_query_params,
            AuthConfig::default().pass_query_params
        );
        assert_eq!(config.pass_json_body_params, ["token"]);
        assert!(config.pass_form_data_params.is_empty());
    }

    #[test]
    fn options_take_flags_over_credentials() {
        let args = parse(&[
            "--url",
            "https://h/openapi.json",
            "--name",
            "pets",
            "--service-url",
            "http://localhost:9000/",
            "--api-version",
            "05-2025",
            "--timeout",
            "5",
        ]);
        let mut creds = Credentials::new("k");
        creds.service_url = Some("http://from-file".to_owned());
        let options = build_options(&args, "k", Some(&creds));

        assert_eq!(options.spec_url.as_deref(), Some("https://h/openapi.json"));
        assert_eq!(options.name.as_deref(), Some("pets"));
        let config = options.client_config();
        assert_eq!(config.service_url, "http://localhost:9000");
        assert_eq!(config.api_version.as_str(), "05-2025");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn credentials_service_url_is_fallback() {
        let args = parse(&["--file", "a.json"]);
        let mut creds = Credentials::new("k");
        creds.service_url = Some("http://from-file".to_owned());
        let options = build_options(&args, "k", Some(&creds));
        assert_eq!(options.client_config().service_url, "http://from-file");
    }

    #[test]
    fn progress_is_silent_in_json_mode() {
        let options = DeployOptions::new("k");
        let progress = Progress::start(true, &options);
        assert!(progress.0.is_none());
        progress.finish(&Err(DeployError::InvalidArgument("x".to_owned())));
    }

    #[test]
    fn progress_finishes_with_outcome() {
        let options = DeployOptions::new("k").with_name("pets");
        let progress = Progress::start(false, &options);
        let pb = progress.0.clone().unwrap();
        assert!(pb.message().contains("pets"));

        progress.finish(&Err(DeployError::InvalidArgument("x".to_owned())));
        assert!(pb.is_finished());
        assert!(pb.message().contains("invalid_argument"));
    }

    #[test]
    fn unknown_api_version_is_rejected_by_parser() {
        let parsed = Wrapper::try_parse_from(["deploy", "--file", "a.json", "--api-version", "v9"]);
        assert!(parsed.is_err());
    }
}
