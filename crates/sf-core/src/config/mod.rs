//! Onboarding configuration DTO.
//!
//! Maps a TOML document onto [`OnboardingConfig`]. Missing keys fall back to the
//! documented defaults; reading the file is the infrastructure layer's job.

use serde::{Deserialize, Serialize};

use crate::onboarding::lockout::DEFAULT_MAX_OTP_ATTEMPTS;
use crate::onboarding::resend_timer::DEFAULT_RESEND_COOLDOWN_SECS;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingConfig {
    /// Marketplace REST API root, without trailing slash.
    pub api_base_url: String,

    pub request_timeout_secs: u64,

    /// Cooldown before a new code may be requested.
    pub resend_cooldown_secs: u32,

    /// Rejected verifications allowed before the challenge locks.
    pub max_otp_attempts: u32,
}

impl Default for OnboardingConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            resend_cooldown_secs: DEFAULT_RESEND_COOLDOWN_SECS,
            max_otp_attempts: DEFAULT_MAX_OTP_ATTEMPTS,
        }
    }
}

impl OnboardingConfig {
    /// Create a config from a parsed TOML value.
    ///
    /// ```toml
    /// [api]
    /// base_url = "https://market.example/api"
    /// timeout_secs = 10
    ///
    /// [otp]
    /// resend_cooldown_secs = 60
    /// max_attempts = 3
    /// ```
    pub fn from_toml(toml_value: &toml::Value) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let api = toml_value.get("api");
        let otp = toml_value.get("otp");

        let api_base_url = api
            .and_then(|a| a.get("base_url"))
            .and_then(|v| v.as_str())
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_base_url);

        Ok(Self {
            api_base_url,
            request_timeout_secs: read_unsigned(api, "timeout_secs")?
                .unwrap_or(defaults.request_timeout_secs),
            resend_cooldown_secs: read_unsigned(otp, "resend_cooldown_secs")?
                .map(u32::try_from)
                .transpose()?
                .unwrap_or(defaults.resend_cooldown_secs),
            max_otp_attempts: read_unsigned(otp, "max_attempts")?
                .map(u32::try_from)
                .transpose()?
                .unwrap_or(defaults.max_otp_attempts),
        })
    }
}

fn read_unsigned(section: Option<&toml::Value>, key: &str) -> anyhow::Result<Option<u64>> {
    match section.and_then(|s| s.get(key)) {
        None => Ok(None),
        Some(value) => {
            let raw = value
                .as_integer()
                .ok_or_else(|| anyhow::anyhow!("`{key}` must be an integer"))?;
            let parsed = u64::try_from(raw)
                .map_err(|_| anyhow::anyhow!("`{key}` must not be negative, got {raw}"))?;
            Ok(Some(parsed))
        }
    }
}
