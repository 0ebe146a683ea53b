use std::path::Path;

use tracing::{info, warn};

const SECRETS_FILE: &str = ".secrets.env";

/// Env files applied in order, later files overriding earlier ones.
pub fn env_files_for_profile(profile: &str) -> Vec<&'static str> {
    match profile {
        "production" | "release" => vec!["config/common.env", "config/prod.env", SECRETS_FILE],
        _ => vec!["config/common.env", "config/dev.env", SECRETS_FILE],
    }
}

pub fn load_environment() -> Result<(), Box<dyn std::error::Error>> {
    let profile = dotenvy::var("ROCKET_PROFILE").unwrap_or_else(|_| "development".to_string());

    for env_file in env_files_for_profile(&profile) {
        load_env_file(env_file)?;
    }

    Ok(())
}

fn load_env_file(path: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !Path::new(path).exists() {
        warn!("Environment file {} not found, skipping", path);
        return Ok(());
    }

    dotenvy::from_filename_override(path)?;
    info!("Loaded environment from: {}", path);
    Ok(())
}
