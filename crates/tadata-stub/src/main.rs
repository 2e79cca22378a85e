use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tadata_stub::Stub;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "tadata-stub", about = "Local stub of the Tadata deployment API")]
struct Cli {
    /// Port to listen on.
    #[arg(long, default_value_t = 8787)]
    port: u16,

    /// API key accepted by the stub (repeatable).
    #[arg(long = "api-key", default_value = "test-key")]
    api_keys: Vec<String>,

    /// OpenAPI document to serve under /specs/{file name} (repeatable).
    #[arg(long = "serve")]
    documents: Vec<PathBuf>,
}

fn content_type(path: &std::path::Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("yaml" | "yml") => "application/yaml",
        _ => "application/json",
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let stub = Stub::new(cli.api_keys);

    for path in &cli.documents {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            error!("not a file: {}", path.display());
            return ExitCode::FAILURE;
        };
        match std::fs::read_to_string(path) {
            Ok(body) => {
                stub.add_document(name, content_type(path), &body);
                info!("serving {} at /specs/{name}", path.display());
            }
            Err(e) => {
                error!("failed to read {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        }
    }

    let addr = format!("0.0.0.0:{}", cli.port);
    let server = match tiny_http::Server::http(&addr) {
        Ok(server) => server,
        Err(e) => {
            error!("failed to bind {addr}: {e}");
            return ExitCode::FAILURE;
        }
    };
    info!("starting tadata-stub on {addr}");
    tadata_stub::run_server(&Arc::new(stub), &server);
    ExitCode::SUCCESS
}
