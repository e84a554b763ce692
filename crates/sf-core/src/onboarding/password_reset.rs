//! Password reset flow: `collecting-email -> otp-pending -> resetting-password -> done`.

use serde::Serialize;

use super::error::{OnboardingError, ValidationError};
use super::flow::{apply_otp_event, is_stale, FlowEvent, FlowMachine, OtpEffect, OtpEvent};
use super::forms::{validate_email, NewPasswordForm};
use super::otp::{OtpChallenge, OtpCode};
use super::session::{FlowKind, OnboardingSession, StageView};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PasswordResetStage {
    CollectingEmail {
        sending: bool,
        error: Option<OnboardingError>,
    },
    OtpPending {
        challenge: OtpChallenge,
        error: Option<OnboardingError>,
    },
    ResettingPassword {
        in_flight: bool,
        error: Option<OnboardingError>,
    },
    Done,
}

impl StageView for PasswordResetStage {
    fn name(&self) -> &'static str {
        match self {
            PasswordResetStage::CollectingEmail { .. } => "collecting-email",
            PasswordResetStage::OtpPending { .. } => "otp-pending",
            PasswordResetStage::ResettingPassword { .. } => "resetting-password",
            PasswordResetStage::Done => "done",
        }
    }

    fn error(&self) -> Option<&OnboardingError> {
        match self {
            PasswordResetStage::CollectingEmail { error, .. }
            | PasswordResetStage::OtpPending { error, .. }
            | PasswordResetStage::ResettingPassword { error, .. } => error.as_ref(),
            PasswordResetStage::Done => None,
        }
    }

    fn challenge(&self) -> Option<&OtpChallenge> {
        match self {
            PasswordResetStage::OtpPending { challenge, .. } => Some(challenge),
            _ => None,
        }
    }

    fn is_busy(&self) -> bool {
        match self {
            PasswordResetStage::CollectingEmail { sending, .. } => *sending,
            PasswordResetStage::OtpPending { challenge, .. } => {
                challenge.is_verifying() || challenge.is_resending()
            }
            PasswordResetStage::ResettingPassword { in_flight, .. } => *in_flight,
            PasswordResetStage::Done => false,
        }
    }
}

#[derive(Debug)]
pub enum PasswordResetEvent {
    SubmitEmail { email: String },
    Otp(OtpEvent),
    SubmitNewPassword(NewPasswordForm),
    Retry,
    Back,
    Restart,

    ResetOtpSent { generation: u64 },
    ResetOtpSendFailed { generation: u64, error: OnboardingError },
    ResetOtpVerified { generation: u64 },
    PasswordReset { generation: u64 },
    PasswordResetFailed { generation: u64, error: OnboardingError },
}

impl FlowEvent for PasswordResetEvent {
    fn generation(&self) -> Option<u64> {
        match self {
            PasswordResetEvent::Otp(event) => event.generation(),
            PasswordResetEvent::ResetOtpSent { generation }
            | PasswordResetEvent::ResetOtpSendFailed { generation, .. }
            | PasswordResetEvent::ResetOtpVerified { generation }
            | PasswordResetEvent::PasswordReset { generation }
            | PasswordResetEvent::PasswordResetFailed { generation, .. } => Some(*generation),
            _ => None,
        }
    }

    fn otp(event: OtpEvent) -> Self {
        PasswordResetEvent::Otp(event)
    }

    fn retry() -> Self {
        PasswordResetEvent::Retry
    }

    fn back() -> Self {
        PasswordResetEvent::Back
    }

    fn restart() -> Self {
        PasswordResetEvent::Restart
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordResetAction {
    SendResetOtp { email: String },
    ResendResetOtp { email: String },
    VerifyResetOtp { email: String, code: OtpCode },
    StartCountdown { seconds: u32 },
    CancelCountdown,
    /// Uses the stored new-password draft.
    ResetPassword { email: String },
    DiscardDrafts,
}

type Session = OnboardingSession<PasswordResetStage>;

pub struct PasswordResetMachine;

impl FlowMachine for PasswordResetMachine {
    const KIND: FlowKind = FlowKind::PasswordReset;

    type Stage = PasswordResetStage;
    type Event = PasswordResetEvent;
    type Action = PasswordResetAction;

    fn initial_stage() -> PasswordResetStage {
        PasswordResetStage::CollectingEmail {
            sending: false,
            error: None,
        }
    }

    fn transition(
        session: Session,
        event: PasswordResetEvent,
    ) -> (Session, Vec<PasswordResetAction>) {
        if is_stale(&session, &event) {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                generation = session.generation,
                ?event,
                "dropping stale password reset result"
            );
            return (session, Vec::new());
        }

        match event {
            PasswordResetEvent::Restart => (
                session.restarted(Self::initial_stage()),
                vec![
                    PasswordResetAction::CancelCountdown,
                    PasswordResetAction::DiscardDrafts,
                ],
            ),
            PasswordResetEvent::Back => Self::back(session),
            event => Self::forward(session, event),
        }
    }
}

impl PasswordResetMachine {
    fn back(mut session: Session) -> (Session, Vec<PasswordResetAction>) {
        match session.stage {
            PasswordResetStage::OtpPending { .. } => {
                session.generation += 1;
                (
                    session.with_stage(Self::initial_stage()),
                    vec![PasswordResetAction::CancelCountdown],
                )
            }
            PasswordResetStage::ResettingPassword { .. } => {
                // No code is outstanding; the user can ask for one straight away.
                session.generation += 1;
                let challenge = OtpChallenge::awaiting_resend(session.settings.lockout);
                (
                    session.with_stage(PasswordResetStage::OtpPending {
                        challenge,
                        error: None,
                    }),
                    Vec::new(),
                )
            }
            _ => (session, Vec::new()),
        }
    }

    fn forward(
        mut session: Session,
        event: PasswordResetEvent,
    ) -> (Session, Vec<PasswordResetAction>) {
        let stage = std::mem::replace(&mut session.stage, PasswordResetStage::Done);
        match (stage, event) {
            (
                PasswordResetStage::CollectingEmail { sending: false, .. },
                PasswordResetEvent::SubmitEmail { email },
            ) => match validate_email(&email) {
                Ok(()) => {
                    let email = email.trim().to_string();
                    session.contact = Some(email.clone());
                    (
                        session.with_stage(PasswordResetStage::CollectingEmail {
                            sending: true,
                            error: None,
                        }),
                        vec![PasswordResetAction::SendResetOtp { email }],
                    )
                }
                Err(err) => (
                    session.with_stage(PasswordResetStage::CollectingEmail {
                        sending: false,
                        error: Some(err.into()),
                    }),
                    Vec::new(),
                ),
            },
            (PasswordResetStage::CollectingEmail { sending: false, error }, PasswordResetEvent::Retry) => {
                match session.contact.clone() {
                    Some(email) => (
                        session.with_stage(PasswordResetStage::CollectingEmail {
                            sending: true,
                            error: None,
                        }),
                        vec![PasswordResetAction::SendResetOtp { email }],
                    ),
                    None => (
                        session.with_stage(PasswordResetStage::CollectingEmail {
                            sending: false,
                            error,
                        }),
                        Vec::new(),
                    ),
                }
            }
            (
                PasswordResetStage::CollectingEmail { sending: true, .. },
                PasswordResetEvent::ResetOtpSent { .. },
            ) => {
                let seconds = session.settings.resend_cooldown_secs;
                let challenge = OtpChallenge::issued(session.settings.lockout, seconds);
                (
                    session.with_stage(PasswordResetStage::OtpPending {
                        challenge,
                        error: None,
                    }),
                    vec![PasswordResetAction::StartCountdown { seconds }],
                )
            }
            (
                PasswordResetStage::CollectingEmail { sending: true, .. },
                PasswordResetEvent::ResetOtpSendFailed { error, .. },
            ) => (
                session.with_stage(PasswordResetStage::CollectingEmail {
                    sending: false,
                    error: Some(error),
                }),
                Vec::new(),
            ),

            (PasswordResetStage::OtpPending { mut challenge, mut error }, PasswordResetEvent::Otp(otp)) => {
                let effects = apply_otp_event(&mut challenge, &mut error, otp, &session.settings);
                let actions = Self::otp_actions(&session, effects);
                (
                    session.with_stage(PasswordResetStage::OtpPending { challenge, error }),
                    actions,
                )
            }
            (PasswordResetStage::OtpPending { mut challenge, mut error }, PasswordResetEvent::Retry) => {
                let effects =
                    apply_otp_event(&mut challenge, &mut error, OtpEvent::Submit, &session.settings);
                let actions = Self::otp_actions(&session, effects);
                (
                    session.with_stage(PasswordResetStage::OtpPending { challenge, error }),
                    actions,
                )
            }
            (
                PasswordResetStage::OtpPending { challenge, .. },
                PasswordResetEvent::ResetOtpVerified { .. },
            ) if challenge.is_verifying() => (
                session.with_stage(PasswordResetStage::ResettingPassword {
                    in_flight: false,
                    error: None,
                }),
                vec![PasswordResetAction::CancelCountdown],
            ),

            (
                PasswordResetStage::ResettingPassword { in_flight: false, .. },
                PasswordResetEvent::SubmitNewPassword(form),
            ) => match form.validate() {
                Ok(()) => Self::reset_password(session),
                Err(err) => (
                    session.with_stage(PasswordResetStage::ResettingPassword {
                        in_flight: false,
                        error: Some(err.into()),
                    }),
                    Vec::new(),
                ),
            },
            (PasswordResetStage::ResettingPassword { in_flight: false, .. }, PasswordResetEvent::Retry) => {
                Self::reset_password(session)
            }
            (
                PasswordResetStage::ResettingPassword { in_flight: true, .. },
                PasswordResetEvent::PasswordReset { .. },
            ) => (session.with_stage(PasswordResetStage::Done), Vec::new()),
            (
                PasswordResetStage::ResettingPassword { in_flight: true, .. },
                PasswordResetEvent::PasswordResetFailed { error, .. },
            ) => (
                session.with_stage(PasswordResetStage::ResettingPassword {
                    in_flight: false,
                    error: Some(error),
                }),
                Vec::new(),
            ),

            (stage, _event) => (session.with_stage(stage), Vec::new()),
        }
    }

    fn otp_actions(session: &Session, effects: Vec<OtpEffect>) -> Vec<PasswordResetAction> {
        let email = session.contact.clone().unwrap_or_default();
        effects
            .into_iter()
            .map(|effect| match effect {
                OtpEffect::Verify { code } => PasswordResetAction::VerifyResetOtp {
                    email: email.clone(),
                    code,
                },
                OtpEffect::Resend => PasswordResetAction::ResendResetOtp {
                    email: email.clone(),
                },
                OtpEffect::StartCountdown { seconds } => {
                    PasswordResetAction::StartCountdown { seconds }
                }
                OtpEffect::CancelCountdown => PasswordResetAction::CancelCountdown,
            })
            .collect()
    }

    fn reset_password(session: Session) -> (Session, Vec<PasswordResetAction>) {
        match session.contact.clone() {
            Some(email) => (
                session.with_stage(PasswordResetStage::ResettingPassword {
                    in_flight: true,
                    error: None,
                }),
                vec![PasswordResetAction::ResetPassword { email }],
            ),
            None => (
                session.with_stage(PasswordResetStage::ResettingPassword {
                    in_flight: false,
                    error: Some(ValidationError::MissingField("email").into()),
                }),
                Vec::new(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onboarding::session::FlowSettings;
    use crate::security::SecretString;

    const EMAIL: &str = "ada@atelier.test";

    fn step(session: Session, event: PasswordResetEvent) -> (Session, Vec<PasswordResetAction>) {
        PasswordResetMachine::transition(session, event)
    }

    fn at_otp_pending() -> Session {
        let session = PasswordResetMachine::start(FlowSettings::default());
        let (session, _) = step(
            session,
            PasswordResetEvent::SubmitEmail {
                email: format!("  {EMAIL} "),
            },
        );
        let (session, _) = step(session, PasswordResetEvent::ResetOtpSent { generation: 0 });
        session
    }

    fn verified() -> Session {
        let mut session = at_otp_pending();
        for (index, c) in "654321".chars().enumerate() {
            session = step(
                session,
                PasswordResetEvent::Otp(OtpEvent::DigitEntered {
                    index,
                    value: c.to_string(),
                }),
            )
            .0;
        }
        step(session, PasswordResetEvent::ResetOtpVerified { generation: 0 }).0
    }

    fn new_password(password: &str, confirm: &str) -> NewPasswordForm {
        NewPasswordForm {
            password: SecretString::from(password),
            confirm_password: SecretString::from(confirm),
        }
    }

    #[test]
    fn password_reset_submit_email_trims_and_sends() {
        let (session, actions) = step(
            PasswordResetMachine::start(FlowSettings::default()),
            PasswordResetEvent::SubmitEmail {
                email: format!(" {EMAIL}"),
            },
        );
        assert_eq!(
            actions,
            vec![PasswordResetAction::SendResetOtp {
                email: EMAIL.to_string()
            }]
        );
        assert_eq!(session.contact.as_deref(), Some(EMAIL));
    }

    #[test]
    fn password_reset_otp_sent_starts_countdown() {
        let session = PasswordResetMachine::start(FlowSettings::default());
        let (session, _) = step(
            session,
            PasswordResetEvent::SubmitEmail {
                email: EMAIL.to_string(),
            },
        );
        let (session, actions) = step(session, PasswordResetEvent::ResetOtpSent { generation: 0 });
        assert_eq!(actions, vec![PasswordResetAction::StartCountdown { seconds: 60 }]);
        assert_eq!(session.stage.name(), "otp-pending");
    }

    #[test]
    fn password_reset_verify_carries_contact() {
        let mut session = at_otp_pending();
        let mut actions = Vec::new();
        for (index, c) in "654321".chars().enumerate() {
            let (next, more) = step(
                session,
                PasswordResetEvent::Otp(OtpEvent::DigitEntered {
                    index,
                    value: c.to_string(),
                }),
            );
            session = next;
            actions.extend(more);
        }
        assert_eq!(
            actions,
            vec![PasswordResetAction::VerifyResetOtp {
                email: EMAIL.to_string(),
                code: OtpCode::parse("654321").unwrap(),
            }]
        );
    }

    #[test]
    fn password_reset_mismatched_password_stays_local() {
        let (session, actions) = step(
            verified(),
            PasswordResetEvent::SubmitNewPassword(new_password("long-enough", "long-enougH")),
        );
        assert!(actions.is_empty());
        assert_eq!(
            session.stage.error(),
            Some(&OnboardingError::Validation(ValidationError::PasswordMismatch))
        );
    }

    #[test]
    fn password_reset_success_reaches_done() {
        let (session, actions) = step(
            verified(),
            PasswordResetEvent::SubmitNewPassword(new_password("long-enough", "long-enough")),
        );
        assert_eq!(
            actions,
            vec![PasswordResetAction::ResetPassword {
                email: EMAIL.to_string()
            }]
        );
        let (session, _) = step(session, PasswordResetEvent::PasswordReset { generation: 0 });
        assert_eq!(session.stage, PasswordResetStage::Done);
    }

    #[test]
    fn password_reset_back_from_resetting_allows_immediate_resend() {
        let (session, _) = step(verified(), PasswordResetEvent::Back);
        assert_eq!(session.generation, 1);
        let challenge = session.stage.challenge().unwrap();
        assert!(!challenge.resend_timer().is_active());

        let (_, actions) = step(session, PasswordResetEvent::Otp(OtpEvent::Resend));
        assert_eq!(
            actions,
            vec![PasswordResetAction::ResendResetOtp {
                email: EMAIL.to_string()
            }]
        );
    }

    #[test]
    fn password_reset_back_from_otp_ignores_late_send_result() {
        let (session, actions) = step(at_otp_pending(), PasswordResetEvent::Back);
        assert_eq!(actions, vec![PasswordResetAction::CancelCountdown]);
        assert_eq!(session.stage.name(), "collecting-email");

        let (session, actions) = step(session, PasswordResetEvent::ResetOtpVerified { generation: 0 });
        assert!(actions.is_empty());
        assert_eq!(session.stage.name(), "collecting-email");
    }

    #[test]
    fn password_reset_failure_can_be_retried() {
        let (session, _) = step(
            verified(),
            PasswordResetEvent::SubmitNewPassword(new_password("long-enough", "long-enough")),
        );
        let (session, _) = step(
            session,
            PasswordResetEvent::PasswordResetFailed {
                generation: 0,
                error: OnboardingError::TransientNetwork("connection reset".into()),
            },
        );
        assert!(session.stage.error().unwrap().is_retryable());
        let (_, actions) = step(session, PasswordResetEvent::Retry);
        assert_eq!(
            actions,
            vec![PasswordResetAction::ResetPassword {
                email: EMAIL.to_string()
            }]
        );
    }
}
