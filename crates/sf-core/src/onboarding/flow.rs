//! Generic flow machine contract and the OTP sub-machine shared by every flow.

use std::fmt::Debug;

use super::error::{OnboardingError, ValidationError};
use super::otp::{DigitEntry, OtpChallenge, OtpCode, RejectionOutcome, ResendBlocked, SubmitBlocked};
use super::session::{FlowKind, FlowSettings, OnboardingSession, StageView};

/// A pure onboarding state machine: `(session, event) -> (session, actions)`.
///
/// Implementations perform no I/O. Actions describe side effects for the
/// orchestrator; their outcomes come back as events tagged with the session
/// generation they were issued under.
pub trait FlowMachine: Send + Sync + 'static {
    const KIND: FlowKind;

    type Stage: StageView + Clone + Debug + PartialEq + Send + Sync;
    type Event: FlowEvent + Debug + Send;
    type Action: Debug + Send;

    fn initial_stage() -> Self::Stage;

    fn transition(
        session: OnboardingSession<Self::Stage>,
        event: Self::Event,
    ) -> (OnboardingSession<Self::Stage>, Vec<Self::Action>);

    fn start(settings: FlowSettings) -> OnboardingSession<Self::Stage> {
        OnboardingSession::new(Self::initial_stage(), settings)
    }
}

/// Events every flow understands, so hosts can drive the shared parts generically.
pub trait FlowEvent: Sized {
    /// Generation an asynchronous result belongs to; `None` for user input.
    fn generation(&self) -> Option<u64>;

    fn otp(event: OtpEvent) -> Self;
    fn retry() -> Self;
    fn back() -> Self;
    fn restart() -> Self;

    /// Event raised by the countdown scheduler once per second.
    fn countdown_tick(generation: u64) -> Self {
        Self::otp(OtpEvent::Tick { generation })
    }
}

/// Drops results that belong to an earlier generation of the session.
pub fn is_stale<S, E: FlowEvent>(session: &OnboardingSession<S>, event: &E) -> bool {
    event
        .generation()
        .map(|g| !session.is_current(g))
        .unwrap_or(false)
}

/// Inputs handled identically by every flow while a code is pending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OtpEvent {
    DigitEntered { index: usize, value: String },
    DigitDeleted { index: usize },
    Submit,
    Resend,
    Tick { generation: u64 },
    Rejected { generation: u64 },
    Interrupted { generation: u64, error: OnboardingError },
    ResendSucceeded { generation: u64 },
    ResendFailed { generation: u64, error: OnboardingError },
}

impl OtpEvent {
    pub fn generation(&self) -> Option<u64> {
        match self {
            OtpEvent::Tick { generation }
            | OtpEvent::Rejected { generation }
            | OtpEvent::Interrupted { generation, .. }
            | OtpEvent::ResendSucceeded { generation }
            | OtpEvent::ResendFailed { generation, .. } => Some(*generation),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OtpEffect {
    Verify { code: OtpCode },
    Resend,
    StartCountdown { seconds: u32 },
    CancelCountdown,
}

/// Applies an [`OtpEvent`] to the pending challenge and its error slot.
pub fn apply_otp_event(
    challenge: &mut OtpChallenge,
    error: &mut Option<OnboardingError>,
    event: OtpEvent,
    settings: &FlowSettings,
) -> Vec<OtpEffect> {
    match event {
        OtpEvent::DigitEntered { index, value } => match challenge.enter_digit(index, &value) {
            DigitEntry::Ignored => {
                *error = Some(ValidationError::InvalidOtpDigit.into());
                Vec::new()
            }
            DigitEntry::Accepted { submit: Some(code) } => {
                *error = None;
                vec![OtpEffect::Verify { code }]
            }
            DigitEntry::Accepted { submit: None } => {
                if challenge.is_locked() {
                    *error = Some(OnboardingError::OtpLocked);
                } else if matches!(error, Some(OnboardingError::Validation(_))) {
                    *error = None;
                }
                Vec::new()
            }
        },
        OtpEvent::DigitDeleted { index } => {
            challenge.delete_digit(index);
            Vec::new()
        }
        OtpEvent::Submit => match challenge.begin_submit() {
            Ok(code) => {
                *error = None;
                vec![OtpEffect::Verify { code }]
            }
            Err(SubmitBlocked::Locked) => {
                *error = Some(OnboardingError::OtpLocked);
                Vec::new()
            }
            Err(SubmitBlocked::Incomplete) => {
                *error = Some(ValidationError::MissingField("verification code").into());
                Vec::new()
            }
            Err(SubmitBlocked::InFlight) => Vec::new(),
        },
        OtpEvent::Resend => match challenge.begin_resend() {
            Ok(()) => vec![OtpEffect::Resend],
            Err(ResendBlocked::Locked) => {
                *error = Some(OnboardingError::OtpLocked);
                Vec::new()
            }
            Err(ResendBlocked::CoolingDown { .. }) | Err(ResendBlocked::InFlight) => Vec::new(),
        },
        OtpEvent::Tick { .. } => {
            if challenge.tick() {
                #[cfg(feature = "tracing")]
                tracing::debug!("resend cooldown elapsed");
            }
            Vec::new()
        }
        OtpEvent::Rejected { .. } => match challenge.verification_rejected() {
            RejectionOutcome::Retry { attempts_remaining } => {
                *error = Some(OnboardingError::OtpRejected { attempts_remaining });
                Vec::new()
            }
            RejectionOutcome::Locked => {
                challenge.cancel_countdown();
                *error = Some(OnboardingError::OtpLocked);
                vec![OtpEffect::CancelCountdown]
            }
        },
        OtpEvent::Interrupted { error: cause, .. } => {
            challenge.verification_interrupted();
            *error = Some(cause);
            Vec::new()
        }
        OtpEvent::ResendSucceeded { .. } => {
            challenge.resend_succeeded(settings.resend_cooldown_secs);
            *error = None;
            vec![OtpEffect::StartCountdown {
                seconds: settings.resend_cooldown_secs,
            }]
        }
        OtpEvent::ResendFailed { error: cause, .. } => {
            challenge.resend_failed();
            *error = Some(cause);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> FlowSettings {
        FlowSettings::default()
    }

    #[test]
    fn sixth_digit_yields_single_verify_effect() {
        let mut challenge = OtpChallenge::issued(settings().lockout, 60);
        let mut error = None;
        let mut effects = Vec::new();
        for (i, c) in "123456".chars().enumerate() {
            effects.extend(apply_otp_event(
                &mut challenge,
                &mut error,
                OtpEvent::DigitEntered {
                    index: i,
                    value: c.to_string(),
                },
                &settings(),
            ));
        }
        for _ in 0..3 {
            effects.extend(apply_otp_event(
                &mut challenge,
                &mut error,
                OtpEvent::DigitEntered {
                    index: 5,
                    value: "6".to_string(),
                },
                &settings(),
            ));
        }
        assert_eq!(
            effects,
            vec![OtpEffect::Verify {
                code: OtpCode::parse("123456").unwrap()
            }]
        );
    }

    #[test]
    fn manual_submit_on_partial_code_surfaces_validation_error() {
        let mut challenge = OtpChallenge::issued(settings().lockout, 60);
        let mut error = None;
        let effects = apply_otp_event(&mut challenge, &mut error, OtpEvent::Submit, &settings());
        assert!(effects.is_empty());
        assert_eq!(
            error,
            Some(OnboardingError::Validation(ValidationError::MissingField(
                "verification code"
            )))
        );
    }

    #[test]
    fn resend_success_restarts_countdown() {
        let mut challenge = OtpChallenge::awaiting_resend(settings().lockout);
        let mut error = None;
        assert_eq!(
            apply_otp_event(&mut challenge, &mut error, OtpEvent::Resend, &settings()),
            vec![OtpEffect::Resend]
        );
        assert_eq!(
            apply_otp_event(
                &mut challenge,
                &mut error,
                OtpEvent::ResendSucceeded { generation: 0 },
                &settings()
            ),
            vec![OtpEffect::StartCountdown { seconds: 60 }]
        );
        assert_eq!(challenge.resend_timer().remaining(), 60);
    }
}
