//! Onboarding session aggregate and its serializable snapshot.

use serde::{Deserialize, Serialize};

use super::error::OnboardingError;
use super::lockout::LockoutPolicy;
use super::otp::{OtpChallenge, OTP_LENGTH};
use super::resend_timer::DEFAULT_RESEND_COOLDOWN_SECS;
use crate::config::OnboardingConfig;
use crate::ids::{SellerId, ShopId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlowKind {
    Registration,
    PasswordReset,
}

impl std::fmt::Display for FlowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlowKind::Registration => f.write_str("registration"),
            FlowKind::PasswordReset => f.write_str("password-reset"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentLink {
    #[default]
    Unset,
    Linked,
    ExplicitlySkipped,
}

/// Identifiers created on the server so far. Forward progress never clears them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionedResources {
    pub seller_id: Option<SellerId>,
    pub shop_id: Option<ShopId>,
    pub payment: PaymentLink,
}

/// Knobs the pure machines need to build OTP challenges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowSettings {
    pub lockout: LockoutPolicy,
    pub resend_cooldown_secs: u32,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            lockout: LockoutPolicy::default(),
            resend_cooldown_secs: DEFAULT_RESEND_COOLDOWN_SECS,
        }
    }
}

impl From<&OnboardingConfig> for FlowSettings {
    fn from(config: &OnboardingConfig) -> Self {
        Self {
            lockout: LockoutPolicy::new(config.max_otp_attempts),
            resend_cooldown_secs: config.resend_cooldown_secs,
        }
    }
}

/// Read-only view every stage enum exposes to snapshots and hosts.
pub trait StageView {
    /// Kebab-case stage name, e.g. `otp-pending`.
    fn name(&self) -> &'static str;
    fn error(&self) -> Option<&OnboardingError>;
    fn challenge(&self) -> Option<&OtpChallenge>;
    /// A request for this stage is outstanding.
    fn is_busy(&self) -> bool;
    /// Hosted page the user must visit before the stage can finish.
    fn redirect_url(&self) -> Option<&str> {
        None
    }
}

/// Top-level aggregate, owned by one workflow instance for its lifetime.
///
/// `generation` changes whenever the user navigates back or restarts; results of
/// requests issued under an older generation are stale and ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingSession<S> {
    pub stage: S,
    /// Email the code was sent to. Fixed while a challenge is pending.
    pub contact: Option<String>,
    pub resources: ProvisionedResources,
    pub generation: u64,
    pub settings: FlowSettings,
}

impl<S> OnboardingSession<S> {
    pub fn new(stage: S, settings: FlowSettings) -> Self {
        Self {
            stage,
            contact: None,
            resources: ProvisionedResources::default(),
            generation: 0,
            settings,
        }
    }

    /// Same session with a different stage.
    pub fn with_stage(self, stage: S) -> Self {
        Self { stage, ..self }
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    /// Fresh session for a full restart; identifiers are dropped.
    pub fn restarted(&self, stage: S) -> Self {
        Self {
            stage,
            contact: None,
            resources: ProvisionedResources::default(),
            generation: self.generation + 1,
            settings: self.settings,
        }
    }
}

impl<S: StageView> OnboardingSession<S> {
    pub fn snapshot(&self, flow: FlowKind) -> SessionSnapshot {
        SessionSnapshot {
            flow,
            stage: self.stage.name().to_string(),
            busy: self.stage.is_busy(),
            contact: self.contact.clone(),
            seller_id: self.resources.seller_id.clone(),
            shop_id: self.resources.shop_id.clone(),
            payment: self.resources.payment,
            error: self.stage.error().map(ToString::to_string),
            retryable: self.stage.error().map(OnboardingError::is_retryable),
            otp: self.stage.challenge().map(OtpView::from),
            redirect_url: self.stage.redirect_url().map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpView {
    pub digits: [Option<char>; OTP_LENGTH],
    pub focused_slot: usize,
    pub attempts_remaining: u32,
    pub locked: bool,
    pub verifying: bool,
    pub resend_in_secs: u32,
    pub can_resend: bool,
}

impl From<&OtpChallenge> for OtpView {
    fn from(challenge: &OtpChallenge) -> Self {
        let resend_in_secs = challenge.resend_timer().remaining();
        Self {
            digits: *challenge.digits(),
            focused_slot: challenge.focused_slot(),
            attempts_remaining: challenge.attempts_remaining(),
            locked: challenge.is_locked(),
            verifying: challenge.is_verifying(),
            resend_in_secs,
            can_resend: !challenge.is_locked() && resend_in_secs == 0 && !challenge.is_resending(),
        }
    }
}

/// What the rendering layer needs after every state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub flow: FlowKind,
    pub stage: String,
    pub busy: bool,
    pub contact: Option<String>,
    pub seller_id: Option<SellerId>,
    pub shop_id: Option<ShopId>,
    pub payment: PaymentLink,
    pub error: Option<String>,
    pub retryable: Option<bool>,
    pub otp: Option<OtpView>,
    pub redirect_url: Option<String>,
}
