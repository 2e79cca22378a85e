use super::{json_pretty, EXIT_SUCCESS};
use serde_json::json;
use std::path::Path;
use tadata_remote::{default_credentials_path, Credentials};

pub fn run(api_key: &str, service_url: Option<&str>, json: bool) -> Result<u8, String> {
    let path = default_credentials_path().map_err(|e| e.to_string())?;
    save(&path, api_key, service_url)?;

    if json {
        let payload = json!({
            "ok": true,
            "credentials_path": path.display().to_string(),
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("saved credentials to {}", path.display());
    }
    Ok(EXIT_SUCCESS)
}

fn save(path: &Path, api_key: &str, service_url: Option<&str>) -> Result<(), String> {
    if api_key.trim().is_empty() {
        return Err("API key must not be empty".to_owned());
    }
    let mut creds = Credentials::new(api_key);
    creds.service_url = service_url.map(str::to_owned);
    creds
        .save(path)
        .map_err(|e| format!("failed to save credentials: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_writes_loadable_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tadata/credentials.json");
        save(&path, "k1", Some("http://localhost:1")).unwrap();

        let creds = Credentials::load(&path).unwrap();
        assert_eq!(creds.api_key, "k1");
        assert_eq!(creds.service_url.as_deref(), Some("http://localhost:1"));
    }

    #[test]
    fn empty_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        assert!(save(&path, "  ", None).is_err());
        assert!(!path.exists());
    }
}
