//! Seller registration flow.
//!
//! `collecting-account -> otp-pending -> verified -> provisioning-shop
//!  -> provisioning-payment -> complete`

use serde::Serialize;

use super::error::{OnboardingError, ValidationError};
use super::flow::{apply_otp_event, is_stale, FlowEvent, FlowMachine, OtpEffect, OtpEvent};
use super::forms::{AccountForm, PaymentChoice, ShopForm};
use super::otp::{OtpChallenge, OtpCode};
use super::session::{FlowKind, OnboardingSession, PaymentLink, StageView};
use crate::ids::{SellerId, ShopId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RegistrationStage {
    CollectingAccount {
        sending: bool,
        error: Option<OnboardingError>,
    },
    OtpPending {
        challenge: OtpChallenge,
        error: Option<OnboardingError>,
    },
    Verified,
    ProvisioningShop {
        in_flight: bool,
        error: Option<OnboardingError>,
    },
    ProvisioningPayment {
        in_flight: bool,
        /// Provider onboarding page the seller was sent to, if any.
        redirect_url: Option<String>,
        error: Option<OnboardingError>,
    },
    Complete,
}

impl StageView for RegistrationStage {
    fn name(&self) -> &'static str {
        match self {
            RegistrationStage::CollectingAccount { .. } => "collecting-account",
            RegistrationStage::OtpPending { .. } => "otp-pending",
            RegistrationStage::Verified => "verified",
            RegistrationStage::ProvisioningShop { .. } => "provisioning-shop",
            RegistrationStage::ProvisioningPayment { .. } => "provisioning-payment",
            RegistrationStage::Complete => "complete",
        }
    }

    fn error(&self) -> Option<&OnboardingError> {
        match self {
            RegistrationStage::CollectingAccount { error, .. }
            | RegistrationStage::OtpPending { error, .. }
            | RegistrationStage::ProvisioningShop { error, .. }
            | RegistrationStage::ProvisioningPayment { error, .. } => error.as_ref(),
            RegistrationStage::Verified | RegistrationStage::Complete => None,
        }
    }

    fn challenge(&self) -> Option<&OtpChallenge> {
        match self {
            RegistrationStage::OtpPending { challenge, .. } => Some(challenge),
            _ => None,
        }
    }

    fn is_busy(&self) -> bool {
        match self {
            RegistrationStage::CollectingAccount { sending, .. } => *sending,
            RegistrationStage::OtpPending { challenge, .. } => {
                challenge.is_verifying() || challenge.is_resending()
            }
            RegistrationStage::ProvisioningShop { in_flight, .. }
            | RegistrationStage::ProvisioningPayment { in_flight, .. } => *in_flight,
            RegistrationStage::Verified | RegistrationStage::Complete => false,
        }
    }

    fn redirect_url(&self) -> Option<&str> {
        match self {
            RegistrationStage::ProvisioningPayment { redirect_url, .. } => redirect_url.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum RegistrationEvent {
    // User input
    SubmitAccount(AccountForm),
    Otp(OtpEvent),
    SubmitShop(ShopForm),
    LinkPayment(PaymentChoice),
    /// Seller came back from the provider's hosted onboarding page.
    ConfirmPaymentReturn,
    SkipPayment,
    Retry,
    Back,
    Restart,

    // Internal
    Advance,

    // Results (from effects)
    OtpSent { generation: u64 },
    OtpSendFailed { generation: u64, error: OnboardingError },
    OtpVerified { generation: u64, seller_id: SellerId },
    ShopCreated { generation: u64, shop_id: ShopId },
    ShopFailed { generation: u64, error: OnboardingError },
    PaymentLinked { generation: u64 },
    PaymentRedirect { generation: u64, url: String },
    PaymentStatusChecked { generation: u64, is_setup: bool },
    PaymentFailed { generation: u64, error: OnboardingError },
}

impl FlowEvent for RegistrationEvent {
    fn generation(&self) -> Option<u64> {
        match self {
            RegistrationEvent::Otp(event) => event.generation(),
            RegistrationEvent::OtpSent { generation }
            | RegistrationEvent::OtpSendFailed { generation, .. }
            | RegistrationEvent::OtpVerified { generation, .. }
            | RegistrationEvent::ShopCreated { generation, .. }
            | RegistrationEvent::ShopFailed { generation, .. }
            | RegistrationEvent::PaymentLinked { generation }
            | RegistrationEvent::PaymentRedirect { generation, .. }
            | RegistrationEvent::PaymentStatusChecked { generation, .. }
            | RegistrationEvent::PaymentFailed { generation, .. } => Some(*generation),
            _ => None,
        }
    }

    fn otp(event: OtpEvent) -> Self {
        RegistrationEvent::Otp(event)
    }

    fn retry() -> Self {
        RegistrationEvent::Retry
    }

    fn back() -> Self {
        RegistrationEvent::Back
    }

    fn restart() -> Self {
        RegistrationEvent::Restart
    }
}

/// Side effects requested by registration transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationAction {
    /// Register the stored account draft; the server emails a code.
    SendOtp,
    /// Replay the same registration payload to get a new code.
    ResendOtp,
    VerifyOtp { code: OtpCode },
    StartCountdown { seconds: u32 },
    CancelCountdown,
    /// Keep the token from the verification this session accepted.
    StoreSession,
    /// Feed `Advance` back in (verified -> provisioning-shop).
    AutoAdvance,
    CreateShop { seller_id: SellerId },
    LinkPayment { seller_id: SellerId, shop_id: ShopId },
    CheckPaymentStatus { seller_id: SellerId },
    DiscardDrafts,
}

impl From<OtpEffect> for RegistrationAction {
    fn from(effect: OtpEffect) -> Self {
        match effect {
            OtpEffect::Verify { code } => RegistrationAction::VerifyOtp { code },
            OtpEffect::Resend => RegistrationAction::ResendOtp,
            OtpEffect::StartCountdown { seconds } => RegistrationAction::StartCountdown { seconds },
            OtpEffect::CancelCountdown => RegistrationAction::CancelCountdown,
        }
    }
}

type Session = OnboardingSession<RegistrationStage>;

/// Pure registration state machine.
pub struct RegistrationMachine;

impl FlowMachine for RegistrationMachine {
    const KIND: FlowKind = FlowKind::Registration;

    type Stage = RegistrationStage;
    type Event = RegistrationEvent;
    type Action = RegistrationAction;

    fn initial_stage() -> RegistrationStage {
        RegistrationStage::CollectingAccount {
            sending: false,
            error: None,
        }
    }

    fn transition(session: Session, event: RegistrationEvent) -> (Session, Vec<RegistrationAction>) {
        if is_stale(&session, &event) {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                generation = session.generation,
                ?event,
                "dropping stale registration result"
            );
            return (session, Vec::new());
        }

        match event {
            RegistrationEvent::Restart => (
                session.restarted(Self::initial_stage()),
                vec![
                    RegistrationAction::CancelCountdown,
                    RegistrationAction::DiscardDrafts,
                ],
            ),
            RegistrationEvent::Back => Self::back(session),
            event => Self::forward(session, event),
        }
    }
}

impl RegistrationMachine {
    fn back(mut session: Session) -> (Session, Vec<RegistrationAction>) {
        match session.stage {
            RegistrationStage::OtpPending { .. } => {
                session.generation += 1;
                (
                    session.with_stage(RegistrationStage::CollectingAccount {
                        sending: false,
                        error: None,
                    }),
                    vec![RegistrationAction::CancelCountdown],
                )
            }
            // Shop and payment steps only move forward.
            _ => (session, Vec::new()),
        }
    }

    fn forward(mut session: Session, event: RegistrationEvent) -> (Session, Vec<RegistrationAction>) {
        let stage = std::mem::replace(&mut session.stage, RegistrationStage::Complete);
        match (stage, event) {
            // ===== Account =====
            (
                RegistrationStage::CollectingAccount { sending: false, .. },
                RegistrationEvent::SubmitAccount(form),
            ) => match form.validate() {
                Ok(()) => {
                    session.contact = Some(form.email.trim().to_string());
                    (
                        session.with_stage(RegistrationStage::CollectingAccount {
                            sending: true,
                            error: None,
                        }),
                        vec![RegistrationAction::SendOtp],
                    )
                }
                Err(err) => (
                    session.with_stage(RegistrationStage::CollectingAccount {
                        sending: false,
                        error: Some(err.into()),
                    }),
                    Vec::new(),
                ),
            },
            (RegistrationStage::CollectingAccount { sending: false, .. }, RegistrationEvent::Retry)
                if session.contact.is_some() =>
            {
                (
                    session.with_stage(RegistrationStage::CollectingAccount {
                        sending: true,
                        error: None,
                    }),
                    vec![RegistrationAction::SendOtp],
                )
            }
            (RegistrationStage::CollectingAccount { sending: true, .. }, RegistrationEvent::OtpSent { .. }) => {
                let challenge =
                    OtpChallenge::issued(session.settings.lockout, session.settings.resend_cooldown_secs);
                let seconds = session.settings.resend_cooldown_secs;
                (
                    session.with_stage(RegistrationStage::OtpPending {
                        challenge,
                        error: None,
                    }),
                    vec![RegistrationAction::StartCountdown { seconds }],
                )
            }
            (
                RegistrationStage::CollectingAccount { sending: true, .. },
                RegistrationEvent::OtpSendFailed { error, .. },
            ) => (
                session.with_stage(RegistrationStage::CollectingAccount {
                    sending: false,
                    error: Some(error),
                }),
                Vec::new(),
            ),

            // ===== OTP =====
            (RegistrationStage::OtpPending { mut challenge, mut error }, RegistrationEvent::Otp(otp)) => {
                let effects = apply_otp_event(&mut challenge, &mut error, otp, &session.settings);
                (
                    session.with_stage(RegistrationStage::OtpPending { challenge, error }),
                    effects.into_iter().map(Into::into).collect(),
                )
            }
            (RegistrationStage::OtpPending { mut challenge, mut error }, RegistrationEvent::Retry) => {
                let effects =
                    apply_otp_event(&mut challenge, &mut error, OtpEvent::Submit, &session.settings);
                (
                    session.with_stage(RegistrationStage::OtpPending { challenge, error }),
                    effects.into_iter().map(Into::into).collect(),
                )
            }
            (
                RegistrationStage::OtpPending { mut challenge, .. },
                RegistrationEvent::OtpVerified { seller_id, .. },
            ) if challenge.is_verifying() => {
                challenge.verification_succeeded();
                session.resources.seller_id = Some(seller_id);
                (
                    session.with_stage(RegistrationStage::Verified),
                    vec![
                        RegistrationAction::StoreSession,
                        RegistrationAction::CancelCountdown,
                        RegistrationAction::AutoAdvance,
                    ],
                )
            }
            (RegistrationStage::Verified, RegistrationEvent::Advance) => (
                session.with_stage(RegistrationStage::ProvisioningShop {
                    in_flight: false,
                    error: None,
                }),
                Vec::new(),
            ),

            // ===== Shop =====
            (
                RegistrationStage::ProvisioningShop { in_flight: false, .. },
                RegistrationEvent::SubmitShop(form),
            ) => match form.validate() {
                Ok(()) => Self::create_shop(session),
                Err(err) => (
                    session.with_stage(RegistrationStage::ProvisioningShop {
                        in_flight: false,
                        error: Some(err.into()),
                    }),
                    Vec::new(),
                ),
            },
            (RegistrationStage::ProvisioningShop { in_flight: false, .. }, RegistrationEvent::Retry) => {
                Self::create_shop(session)
            }
            (
                RegistrationStage::ProvisioningShop { in_flight: true, .. },
                RegistrationEvent::ShopCreated { shop_id, .. },
            ) => {
                session.resources.shop_id = Some(shop_id);
                (session.with_stage(Self::payment_stage(None)), Vec::new())
            }
            (
                RegistrationStage::ProvisioningShop { in_flight: true, .. },
                RegistrationEvent::ShopFailed { error, .. },
            ) => (
                session.with_stage(RegistrationStage::ProvisioningShop {
                    in_flight: false,
                    error: Some(error),
                }),
                Vec::new(),
            ),

            // ===== Payment =====
            (
                RegistrationStage::ProvisioningPayment {
                    in_flight: false,
                    redirect_url,
                    ..
                },
                RegistrationEvent::LinkPayment(choice),
            ) => match choice.validate() {
                Ok(()) => Self::link_payment(session),
                Err(err) => (
                    session.with_stage(RegistrationStage::ProvisioningPayment {
                        in_flight: false,
                        redirect_url,
                        error: Some(err.into()),
                    }),
                    Vec::new(),
                ),
            },
            (
                RegistrationStage::ProvisioningPayment {
                    in_flight: false,
                    redirect_url: Some(url),
                    ..
                },
                RegistrationEvent::ConfirmPaymentReturn | RegistrationEvent::Retry,
            ) => Self::check_payment_status(session, url),
            (
                RegistrationStage::ProvisioningPayment {
                    in_flight: false,
                    redirect_url: None,
                    ..
                },
                RegistrationEvent::Retry,
            ) => Self::link_payment(session),
            (RegistrationStage::ProvisioningPayment { in_flight: false, .. }, RegistrationEvent::SkipPayment) => {
                session.resources.payment = PaymentLink::ExplicitlySkipped;
                (session.with_stage(RegistrationStage::Complete), Vec::new())
            }
            (
                RegistrationStage::ProvisioningPayment { in_flight: true, .. },
                RegistrationEvent::PaymentLinked { .. },
            ) => {
                session.resources.payment = PaymentLink::Linked;
                (session.with_stage(RegistrationStage::Complete), Vec::new())
            }
            (
                RegistrationStage::ProvisioningPayment { in_flight: true, .. },
                RegistrationEvent::PaymentRedirect { url, .. },
            ) => (
                session.with_stage(Self::payment_stage(Some(url))),
                Vec::new(),
            ),
            (
                RegistrationStage::ProvisioningPayment {
                    in_flight: true,
                    redirect_url,
                    ..
                },
                RegistrationEvent::PaymentStatusChecked { is_setup, .. },
            ) => {
                if is_setup {
                    session.resources.payment = PaymentLink::Linked;
                    (session.with_stage(RegistrationStage::Complete), Vec::new())
                } else {
                    (
                        session.with_stage(RegistrationStage::ProvisioningPayment {
                            in_flight: false,
                            redirect_url,
                            error: Some(OnboardingError::PaymentNotConfirmed),
                        }),
                        Vec::new(),
                    )
                }
            }
            (
                RegistrationStage::ProvisioningPayment {
                    in_flight: true,
                    redirect_url,
                    ..
                },
                RegistrationEvent::PaymentFailed { error, .. },
            ) => (
                session.with_stage(RegistrationStage::ProvisioningPayment {
                    in_flight: false,
                    redirect_url,
                    error: Some(error),
                }),
                Vec::new(),
            ),

            // Anything else leaves the stage untouched.
            (stage, _event) => (session.with_stage(stage), Vec::new()),
        }
    }

    fn payment_stage(redirect_url: Option<String>) -> RegistrationStage {
        RegistrationStage::ProvisioningPayment {
            in_flight: false,
            redirect_url,
            error: None,
        }
    }

    fn create_shop(mut session: Session) -> (Session, Vec<RegistrationAction>) {
        match session.resources.seller_id.clone() {
            Some(seller_id) => {
                session.stage = RegistrationStage::ProvisioningShop {
                    in_flight: true,
                    error: None,
                };
                (session, vec![RegistrationAction::CreateShop { seller_id }])
            }
            None => (
                session.with_stage(RegistrationStage::ProvisioningShop {
                    in_flight: false,
                    error: Some(ValidationError::MissingField("seller account").into()),
                }),
                Vec::new(),
            ),
        }
    }

    fn link_payment(session: Session) -> (Session, Vec<RegistrationAction>) {
        match (
            session.resources.seller_id.clone(),
            session.resources.shop_id.clone(),
        ) {
            (Some(seller_id), Some(shop_id)) => (
                session.with_stage(RegistrationStage::ProvisioningPayment {
                    in_flight: true,
                    redirect_url: None,
                    error: None,
                }),
                vec![RegistrationAction::LinkPayment { seller_id, shop_id }],
            ),
            _ => (
                session.with_stage(RegistrationStage::ProvisioningPayment {
                    in_flight: false,
                    redirect_url: None,
                    error: Some(ValidationError::MissingField("shop").into()),
                }),
                Vec::new(),
            ),
        }
    }

    fn check_payment_status(session: Session, url: String) -> (Session, Vec<RegistrationAction>) {
        match session.resources.seller_id.clone() {
            Some(seller_id) => (
                session.with_stage(RegistrationStage::ProvisioningPayment {
                    in_flight: true,
                    redirect_url: Some(url),
                    error: None,
                }),
                vec![RegistrationAction::CheckPaymentStatus { seller_id }],
            ),
            None => (
                session.with_stage(RegistrationStage::ProvisioningPayment {
                    in_flight: false,
                    redirect_url: Some(url),
                    error: Some(ValidationError::MissingField("seller account").into()),
                }),
                Vec::new(),
            ),
        }
    }
}
