//! Marketplace calls made on behalf of the onboarding flows.
//!
//! The coordinator is the only place that knows how raw [`ApiError`]s map onto
//! [`OnboardingError`]. It also holds the session token of the accepted
//! verification and refuses to start an operation that is already in flight.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{info, warn};

use sf_core::ids::{SellerId, ShopId};
use sf_core::onboarding::{AccountForm, OnboardingError, OtpCode, PaymentChoice, ShopForm};
use sf_core::ports::{ApiError, MarketplaceApiPort, PaymentSetupOutcome, VerifiedSeller};
use sf_core::security::SecretString;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    SendRegistrationOtp,
    VerifyRegistrationOtp,
    CreateShop,
    SetupPayment,
    SkipPaymentSetup,
    PaymentStatus,
    SendResetOtp,
    VerifyResetOtp,
    ResetPassword,
}

/// Server verdict on a submitted code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OtpVerdict<T> {
    Accepted(T),
    /// The code was wrong or expired; counts as an attempt.
    Rejected,
}

pub struct ProvisioningCoordinator {
    api: Arc<dyn MarketplaceApiPort>,
    token: Mutex<Option<SecretString>>,
    in_flight: Arc<Mutex<HashSet<Operation>>>,
}

/// Marks an operation in flight until dropped.
struct InFlight {
    operation: Operation,
    set: Arc<Mutex<HashSet<Operation>>>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.operation);
    }
}

impl ProvisioningCoordinator {
    pub fn new(api: Arc<dyn MarketplaceApiPort>) -> Self {
        Self {
            api,
            token: Mutex::new(None),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub async fn send_registration_otp(&self, account: &AccountForm) -> Result<(), OnboardingError> {
        let op = Operation::SendRegistrationOtp;
        let _guard = self.begin(op)?;
        self.api
            .send_registration_otp(account)
            .await
            .map_err(|err| classify(op, err))
    }

    /// The returned token is not kept here: the caller hands it to
    /// [`store_session`](Self::store_session) once the flow accepts the result.
    pub async fn verify_registration_otp(
        &self,
        account: &AccountForm,
        code: &OtpCode,
    ) -> Result<OtpVerdict<VerifiedSeller>, OnboardingError> {
        let op = Operation::VerifyRegistrationOtp;
        let _guard = self.begin(op)?;
        match self.api.verify_registration_otp(account, code).await {
            Ok(verified) => {
                info!(seller_id = %verified.seller_id, "seller verified");
                Ok(OtpVerdict::Accepted(verified))
            }
            Err(err) => verdict(op, err),
        }
    }

    pub async fn create_shop(
        &self,
        seller_id: &SellerId,
        shop: &ShopForm,
    ) -> Result<ShopId, OnboardingError> {
        let op = Operation::CreateShop;
        let _guard = self.begin(op)?;
        let token = self.token();
        let shop_id = self
            .api
            .create_shop(token.as_ref(), seller_id, shop)
            .await
            .map_err(|err| classify(op, err))?;
        info!(%seller_id, %shop_id, "shop created");
        Ok(shop_id)
    }

    pub async fn setup_payment(
        &self,
        seller_id: &SellerId,
        shop_id: &ShopId,
        choice: &PaymentChoice,
    ) -> Result<PaymentSetupOutcome, OnboardingError> {
        let op = Operation::SetupPayment;
        let _guard = self.begin(op)?;
        let token = self.token();
        self.api
            .setup_payment(token.as_ref(), seller_id, shop_id, choice)
            .await
            .map_err(|err| classify(op, err))
    }

    pub async fn payment_status(&self, seller_id: &SellerId) -> Result<bool, OnboardingError> {
        let op = Operation::PaymentStatus;
        let _guard = self.begin(op)?;
        let token = self.token();
        self.api
            .payment_status(token.as_ref(), seller_id)
            .await
            .map_err(|err| classify(op, err))
    }

    /// Tells the server the seller chose to skip payment setup. Best effort:
    /// the session is already complete, so a failure is only logged.
    pub async fn acknowledge_payment_skip(&self, seller_id: &SellerId, shop_id: &ShopId) {
        let op = Operation::SkipPaymentSetup;
        let Ok(_guard) = self.begin(op) else {
            return;
        };
        let token = self.token();
        match self.api.skip_payment_setup(token.as_ref(), seller_id, shop_id).await {
            Ok(()) => info!(%seller_id, %shop_id, "payment setup skip acknowledged"),
            Err(err) => warn!(%seller_id, %shop_id, error = %err, "failed to acknowledge payment skip"),
        }
    }

    pub async fn send_reset_otp(&self, email: &str) -> Result<(), OnboardingError> {
        let op = Operation::SendResetOtp;
        let _guard = self.begin(op)?;
        self.api
            .send_reset_otp(email)
            .await
            .map_err(|err| classify(op, err))
    }

    pub async fn verify_reset_otp(
        &self,
        email: &str,
        code: &OtpCode,
    ) -> Result<OtpVerdict<()>, OnboardingError> {
        let op = Operation::VerifyResetOtp;
        let _guard = self.begin(op)?;
        match self.api.verify_reset_otp(email, code).await {
            Ok(()) => Ok(OtpVerdict::Accepted(())),
            Err(err) => verdict(op, err),
        }
    }

    pub async fn reset_password(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<(), OnboardingError> {
        let op = Operation::ResetPassword;
        let _guard = self.begin(op)?;
        self.api
            .reset_password(email, password)
            .await
            .map_err(|err| classify(op, err))
    }

    /// Token sent as bearer on the provisioning calls.
    pub fn store_session(&self, token: SecretString) {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    /// Forgets the session token. Used on restart.
    pub fn clear_session(&self) {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub fn has_session(&self) -> bool {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn token(&self) -> Option<SecretString> {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(SecretString::duplicate)
    }

    fn begin(&self, operation: Operation) -> Result<InFlight, OnboardingError> {
        let mut set = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if !set.insert(operation) {
            warn!(?operation, "request already in flight");
            return Err(OnboardingError::RequestInFlight);
        }
        Ok(InFlight {
            operation,
            set: Arc::clone(&self.in_flight),
        })
    }
}

fn verdict<T>(op: Operation, err: ApiError) -> Result<OtpVerdict<T>, OnboardingError> {
    match err {
        ApiError::Rejected { status, message } => {
            info!(operation = ?op, status, %message, "verification code rejected");
            Ok(OtpVerdict::Rejected)
        }
        other => Err(classify(op, other)),
    }
}

/// Maps an adapter failure onto the user-facing taxonomy.
fn classify(op: Operation, err: ApiError) -> OnboardingError {
    warn!(operation = ?op, error = %err, "marketplace request failed");
    match err {
        ApiError::Timeout => OnboardingError::TransientNetwork("request timed out".to_string()),
        ApiError::Transport(message) => OnboardingError::TransientNetwork(message),
        ApiError::Conflict { message } => OnboardingError::ResourceConflict(message),
        ApiError::Rejected { status, message } | ApiError::Server { status, message } => {
            OnboardingError::Server { status, message }
        }
        ApiError::Decode(message) => OnboardingError::Server {
            status: 502,
            message: format!("unexpected response: {message}"),
        },
    }
}
