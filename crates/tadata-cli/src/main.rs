mod commands;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use commands::EXIT_FAILURE;
use std::path::PathBuf;
use std::process::ExitCode;
use tadata_core::ApiVersion;

#[derive(Debug, Parser)]
#[command(
    name = "tadata",
    version,
    about = "Deploy MCP servers from OpenAPI specifications"
)]
struct Cli {
    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Flags of the `deploy` command.
#[derive(Debug, Args)]
pub struct DeployArgs {
    /// OpenAPI document on disk (.json, .yaml or .yml).
    #[arg(long)]
    pub file: Option<PathBuf>,
    /// URL to download the OpenAPI document from.
    #[arg(long)]
    pub url: Option<String>,
    /// API key (falls back to TADATA_API_KEY, then the credentials file).
    #[arg(long)]
    pub api_key: Option<String>,
    /// Base URL of the API the MCP server proxies to.
    #[arg(long)]
    pub base_url: Option<String>,
    /// Deployment name; redeploying a name updates it.
    #[arg(long)]
    pub name: Option<String>,
    /// Root URL of the deployment service.
    #[arg(long)]
    pub service_url: Option<String>,
    /// Deployment API version.
    #[arg(long, default_value = "latest")]
    pub api_version: ApiVersion,
    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,
    /// Deploy to the staging service.
    #[arg(long, default_value_t = false)]
    pub dev: bool,
    /// Header forwarded to the upstream API (repeatable; replaces the defaults).
    #[arg(long = "pass-header")]
    pub pass_headers: Vec<String>,
    /// Query parameter forwarded to the upstream API (repeatable; replaces the defaults).
    #[arg(long = "pass-query-param")]
    pub pass_query_params: Vec<String>,
    /// JSON body parameter forwarded to the upstream API (repeatable).
    #[arg(long = "pass-json-body-param")]
    pub pass_json_body_params: Vec<String>,
    /// Form data parameter forwarded to the upstream API (repeatable).
    #[arg(long = "pass-form-data-param")]
    pub pass_form_data_params: Vec<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Deploy an MCP server from an OpenAPI document.
    Deploy(DeployArgs),
    /// Check an OpenAPI document locally without deploying it.
    Validate {
        /// Path to the document (.json, .yaml or .yml).
        path: PathBuf,
    },
    /// Store an API key for later deployments.
    Configure {
        #[arg(long)]
        api_key: String,
        /// Service URL to use instead of the default.
        #[arg(long)]
        service_url: Option<String>,
    },
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("TADATA_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let json_output = cli.json;
    let result = match cli.command {
        Commands::Deploy(args) => commands::deploy::run(&args, json_output),
        Commands::Validate { path } => commands::validate::run(&path, json_output),
        Commands::Configure {
            api_key,
            service_url,
        } => commands::configure::run(&api_key, service_url.as_deref(), json_output),
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}
