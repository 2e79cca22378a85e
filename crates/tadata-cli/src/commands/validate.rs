use super::{json_pretty, report_error, EXIT_SUCCESS};
use serde_json::json;
use std::path::Path;
use tadata_core::{DeployError, OpenApiSpec};

pub fn run(path: &Path, json: bool) -> Result<u8, String> {
    let spec = match OpenApiSpec::from_file(path) {
        Ok(spec) => spec,
        Err(e) => return report_error(&DeployError::from(e), json),
    };

    let info = spec.info();
    if json {
        let payload = json!({
            "ok": true,
            "openapi": spec.openapi(),
            "title": info.title,
            "version": info.version,
            "paths": spec.paths().len(),
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!(
            "{} {} (OpenAPI {}, {} paths)",
            info.title,
            info.version,
            spec.openapi(),
            spec.paths().len()
        );
    }
    Ok(EXIT_SUCCESS)
}
