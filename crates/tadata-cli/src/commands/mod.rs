pub mod completions;
pub mod configure;
pub mod deploy;
pub mod validate;

use serde_json::json;
use tadata_core::{DeployError, ErrorKind};

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_SPEC_INVALID: u8 = 2;
pub const EXIT_AUTH_ERROR: u8 = 3;
pub const EXIT_SERVICE_ERROR: u8 = 4;

pub const API_KEY_ENV: &str = "TADATA_API_KEY";

pub fn exit_code(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::InvalidArgument => EXIT_FAILURE,
        ErrorKind::SpecInvalid => EXIT_SPEC_INVALID,
        ErrorKind::Auth => EXIT_AUTH_ERROR,
        ErrorKind::Api | ErrorKind::Network => EXIT_SERVICE_ERROR,
    }
}

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

/// Print a failed deployment or validation and return its exit code.
pub fn report_error(err: &DeployError, json: bool) -> Result<u8, String> {
    if json {
        let payload = json!({
            "ok": false,
            "error": {
                "code": err.code(),
                "message": err.to_string(),
                "status": err.status_code(),
                "details": err.details(),
            }
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        eprintln!("error: {err}");
        if let Some(details) = err.details() {
            eprintln!("{}", json_pretty(details)?);
        }
    }
    Ok(exit_code(err.kind()))
}

pub fn colorize_outcome(updated: bool) -> String {
    use console::Style;
    if updated {
        Style::new().yellow().apply_to("updated").to_string()
    } else {
        Style::new().green().apply_to("created").to_string()
    }
}
