use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use sf_core::onboarding::{
    AccountForm, OnboardingError, OnboardingSession, OtpEvent, PaymentChoice, RegistrationAction,
    RegistrationEvent, RegistrationMachine, RegistrationStage, ShopForm, ValidationError,
};
use sf_core::ports::{CountdownPort, PaymentSetupOutcome};
use sf_core::security::SecretString;

use crate::usecases::flow::{effects, EffectScope, FlowEffects};
use crate::usecases::provisioning::{OtpVerdict, ProvisioningCoordinator};

/// Form data the registration actions replay.
#[derive(Default)]
struct Drafts {
    account: Option<AccountForm>,
    shop: Option<ShopForm>,
    payment: Option<PaymentChoice>,
}

/// Side-effect executor for [`RegistrationMachine`].
pub struct RegistrationEffects {
    coordinator: Arc<ProvisioningCoordinator>,
    countdown: Arc<dyn CountdownPort>,
    drafts: Mutex<Drafts>,
    /// Token of the last accepted verification, tagged with its generation.
    /// Promoted to the coordinator only on `StoreSession`.
    verified_token: Mutex<Option<(u64, SecretString)>>,
    skip_acknowledged: AtomicBool,
}

impl RegistrationEffects {
    pub fn new(coordinator: Arc<ProvisioningCoordinator>, countdown: Arc<dyn CountdownPort>) -> Self {
        Self {
            coordinator,
            countdown,
            drafts: Mutex::new(Drafts::default()),
            verified_token: Mutex::new(None),
            skip_acknowledged: AtomicBool::new(false),
        }
    }

    pub fn coordinator(&self) -> &Arc<ProvisioningCoordinator> {
        &self.coordinator
    }

    /// `true` the first time it is called for the current session.
    pub(crate) fn claim_skip_acknowledgement(&self) -> bool {
        !self.skip_acknowledged.swap(true, Ordering::SeqCst)
    }

    fn drafts(&self) -> std::sync::MutexGuard<'_, Drafts> {
        self.drafts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn verified_token(&self) -> std::sync::MutexGuard<'_, Option<(u64, SecretString)>> {
        self.verified_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn account(&self) -> Option<AccountForm> {
        self.drafts().account.as_ref().map(AccountForm::duplicate)
    }
}

#[async_trait::async_trait]
impl FlowEffects<RegistrationMachine> for RegistrationEffects {
    fn capture(&self, session: &OnboardingSession<RegistrationStage>, event: &RegistrationEvent) {
        // Only take a draft when the stage will accept it, so a submit ignored
        // mid-request cannot swap the payload under a pending resend.
        match (&session.stage, event) {
            (
                RegistrationStage::CollectingAccount { sending: false, .. },
                RegistrationEvent::SubmitAccount(form),
            ) => self.drafts().account = Some(form.duplicate()),
            (
                RegistrationStage::ProvisioningShop { in_flight: false, .. },
                RegistrationEvent::SubmitShop(form),
            ) => self.drafts().shop = Some(form.clone()),
            (
                RegistrationStage::ProvisioningPayment { in_flight: false, .. },
                RegistrationEvent::LinkPayment(choice),
            ) => self.drafts().payment = Some(choice.clone()),
            _ => {}
        }
    }

    async fn execute(&self, action: RegistrationAction, scope: &EffectScope) -> Vec<RegistrationEvent> {
        let generation = scope.generation;
        match action {
            RegistrationAction::SendOtp => {
                let result = match self.account() {
                    Some(account) => self.coordinator.send_registration_otp(&account).await,
                    None => Err(missing("account details")),
                };
                vec![match result {
                    Ok(()) => RegistrationEvent::OtpSent { generation },
                    Err(error) => RegistrationEvent::OtpSendFailed { generation, error },
                }]
            }
            RegistrationAction::ResendOtp => {
                let result = match self.account() {
                    Some(account) => self.coordinator.send_registration_otp(&account).await,
                    None => Err(missing("account details")),
                };
                vec![RegistrationEvent::Otp(match result {
                    Ok(()) => OtpEvent::ResendSucceeded { generation },
                    Err(error) => OtpEvent::ResendFailed { generation, error },
                })]
            }
            RegistrationAction::VerifyOtp { code } => {
                let result = match self.account() {
                    Some(account) => self.coordinator.verify_registration_otp(&account, &code).await,
                    None => Err(missing("account details")),
                };
                vec![match result {
                    Ok(OtpVerdict::Accepted(verified)) => {
                        *self.verified_token() = Some((generation, verified.token));
                        RegistrationEvent::OtpVerified {
                            generation,
                            seller_id: verified.seller_id,
                        }
                    }
                    Ok(OtpVerdict::Rejected) => {
                        RegistrationEvent::Otp(OtpEvent::Rejected { generation })
                    }
                    Err(error) => RegistrationEvent::Otp(OtpEvent::Interrupted { generation, error }),
                }]
            }
            RegistrationAction::StartCountdown { seconds } => {
                effects::start_countdown::<RegistrationMachine>(&self.countdown, scope, seconds).await;
                Vec::new()
            }
            RegistrationAction::CancelCountdown => {
                effects::cancel_countdown::<RegistrationMachine>(&self.countdown).await;
                Vec::new()
            }
            RegistrationAction::StoreSession => {
                let verified = self.verified_token().take();
                match verified {
                    Some((issued, token)) if issued == generation => {
                        self.coordinator.store_session(token)
                    }
                    _ => debug!(generation, "no session token for this generation"),
                }
                Vec::new()
            }
            RegistrationAction::AutoAdvance => vec![RegistrationEvent::Advance],
            RegistrationAction::CreateShop { seller_id } => {
                let shop = self.drafts().shop.clone();
                let result = match shop {
                    Some(shop) => self.coordinator.create_shop(&seller_id, &shop).await,
                    None => Err(missing("shop details")),
                };
                vec![match result {
                    Ok(shop_id) => RegistrationEvent::ShopCreated { generation, shop_id },
                    Err(error) => RegistrationEvent::ShopFailed { generation, error },
                }]
            }
            RegistrationAction::LinkPayment { seller_id, shop_id } => {
                let choice = self.drafts().payment.clone();
                let result = match choice {
                    Some(choice) => {
                        self.coordinator
                            .setup_payment(&seller_id, &shop_id, &choice)
                            .await
                    }
                    None => Err(missing("payment method")),
                };
                vec![match result {
                    Ok(PaymentSetupOutcome::Confirmed) => RegistrationEvent::PaymentLinked { generation },
                    Ok(PaymentSetupOutcome::Redirect { url }) => {
                        RegistrationEvent::PaymentRedirect { generation, url }
                    }
                    Err(error) => RegistrationEvent::PaymentFailed { generation, error },
                }]
            }
            RegistrationAction::CheckPaymentStatus { seller_id } => {
                vec![match self.coordinator.payment_status(&seller_id).await {
                    Ok(is_setup) => RegistrationEvent::PaymentStatusChecked { generation, is_setup },
                    Err(error) => RegistrationEvent::PaymentFailed { generation, error },
                }]
            }
            RegistrationAction::DiscardDrafts => {
                debug!("discarding registration drafts and session token");
                *self.drafts() = Drafts::default();
                self.verified_token().take();
                self.skip_acknowledged.store(false, Ordering::SeqCst);
                self.coordinator.clear_session();
                Vec::new()
            }
        }
    }
}

fn missing(field: &'static str) -> OnboardingError {
    ValidationError::MissingField(field).into()
}
