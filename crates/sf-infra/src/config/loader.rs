//! Configuration file loading.
//!
//! Pure data loading: read the file, parse TOML, map it onto the DTO.
//! Defaults for missing keys live in [`OnboardingConfig::from_toml`].

use std::path::Path;

use anyhow::Context;
use sf_core::OnboardingConfig;

/// Load configuration from a TOML file.
///
/// # Errors
///
/// Fails when the file cannot be read, is not valid TOML, or holds a value of
/// the wrong type.
pub fn load_config(config_path: &Path) -> anyhow::Result<OnboardingConfig> {
    let content = std::fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
    let toml_value: toml::Value =
        toml::from_str(&content).context("Failed to parse config as TOML")?;
    OnboardingConfig::from_toml(&toml_value)
        .with_context(|| format!("Invalid config file: {}", config_path.display()))
}
