//! Onboarding and identity verification domain.
//!
//! Both flows share one OTP sub-machine ([`flow::apply_otp_event`]) and the
//! [`FlowMachine`] contract; they differ only in their stage chain.

pub mod error;
pub mod flow;
pub mod forms;
pub mod lockout;
pub mod otp;
pub mod password_reset;
pub mod registration;
pub mod resend_timer;
pub mod session;

pub use error::{OnboardingError, ValidationError};
pub use flow::{FlowEvent, FlowMachine, OtpEvent};
pub use forms::{AccountForm, BankDetails, NewPasswordForm, PaymentChoice, ShopForm};
pub use lockout::LockoutPolicy;
pub use otp::{OtpChallenge, OtpCode, OTP_LENGTH};
pub use password_reset::{
    PasswordResetAction, PasswordResetEvent, PasswordResetMachine, PasswordResetStage,
};
pub use registration::{
    RegistrationAction, RegistrationEvent, RegistrationMachine, RegistrationStage,
};
pub use resend_timer::ResendTimer;
pub use session::{
    FlowKind, FlowSettings, OnboardingSession, OtpView, PaymentLink, ProvisionedResources,
    SessionSnapshot, StageView,
};
