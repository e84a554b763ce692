//! Configuration resolution for the CLI host.
//!
//! Order: an explicit `--config` path (must exist), then the per-user file under
//! the platform config dir (used when present), then built-in defaults.
//! `--api-url` always wins over whatever was loaded.

use std::path::{Path, PathBuf};

use sf_core::OnboardingConfig;
use sf_infra::load_config;
use tracing::{debug, info};

const CONFIG_DIR_NAME: &str = "storefront";
const CONFIG_FILE_NAME: &str = "onboarding.toml";

/// `<config_dir>/storefront/onboarding.toml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

pub fn resolve_config(
    explicit: Option<&Path>,
    api_url_override: Option<&str>,
) -> anyhow::Result<OnboardingConfig> {
    resolve_config_from(explicit, default_config_path().as_deref(), api_url_override)
}

fn resolve_config_from(
    explicit: Option<&Path>,
    fallback: Option<&Path>,
    api_url_override: Option<&str>,
) -> anyhow::Result<OnboardingConfig> {
    let mut config = match (explicit, fallback) {
        (Some(path), _) => load_config(path)?,
        (None, Some(path)) if path.is_file() => load_config(path)?,
        _ => {
            debug!("no config file found, using defaults");
            OnboardingConfig::default()
        }
    };

    if let Some(url) = api_url_override {
        config.api_base_url = url.trim_end_matches('/').to_string();
    }

    info!(
        api_base_url = %config.api_base_url,
        timeout_secs = config.request_timeout_secs,
        "onboarding config resolved"
    );
    Ok(config)
}
