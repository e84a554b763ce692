use thiserror::Error;

use crate::ids::{SellerId, ShopId};
use crate::onboarding::{AccountForm, OtpCode, PaymentChoice, ShopForm};
use crate::security::SecretString;

/// Raw failure reported by a marketplace API adapter.
///
/// Classification into the user-facing taxonomy happens in the provisioning
/// coordinator, because the same status means different things per endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    /// 4xx other than 409.
    #[error("rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("conflict: {message}")]
    Conflict { message: String },

    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("unexpected response: {0}")]
    Decode(String),
}

/// Result of a successful registration OTP verification.
#[derive(Debug)]
pub struct VerifiedSeller {
    pub seller_id: SellerId,
    pub token: SecretString,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentSetupOutcome {
    /// Provider onboarding must be finished on a hosted page.
    Redirect { url: String },
    Confirmed,
}

/// Marketplace backend endpoints used by onboarding.
///
/// `token` is the bearer token returned by [`verify_registration_otp`]; it is
/// `None` only if the session never reached verification.
///
/// [`verify_registration_otp`]: MarketplaceApiPort::verify_registration_otp
#[async_trait::async_trait]
pub trait MarketplaceApiPort: Send + Sync {
    /// Registers the account draft; the server emails a code. Also used to resend.
    async fn send_registration_otp(&self, account: &AccountForm) -> Result<(), ApiError>;

    async fn verify_registration_otp(
        &self,
        account: &AccountForm,
        code: &OtpCode,
    ) -> Result<VerifiedSeller, ApiError>;

    async fn create_shop(
        &self,
        token: Option<&SecretString>,
        seller_id: &SellerId,
        shop: &ShopForm,
    ) -> Result<ShopId, ApiError>;

    async fn setup_payment(
        &self,
        token: Option<&SecretString>,
        seller_id: &SellerId,
        shop_id: &ShopId,
        choice: &PaymentChoice,
    ) -> Result<PaymentSetupOutcome, ApiError>;

    async fn skip_payment_setup(
        &self,
        token: Option<&SecretString>,
        seller_id: &SellerId,
        shop_id: &ShopId,
    ) -> Result<(), ApiError>;

    /// `true` once the provider reports the payment method as set up.
    async fn payment_status(
        &self,
        token: Option<&SecretString>,
        seller_id: &SellerId,
    ) -> Result<bool, ApiError>;

    async fn send_reset_otp(&self, email: &str) -> Result<(), ApiError>;

    async fn verify_reset_otp(&self, email: &str, code: &OtpCode) -> Result<(), ApiError>;

    async fn reset_password(&self, email: &str, password: &SecretString) -> Result<(), ApiError>;
}
