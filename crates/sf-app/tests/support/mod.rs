//! Test doubles shared by the flow integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{mpsc, Notify};

use sf_app::usecases::flow::{FlowContext, FlowOrchestrator};
use sf_app::{
    PasswordResetEffects, PasswordResetOrchestrator, ProvisioningCoordinator, RegistrationEffects,
    RegistrationOrchestrator,
};
use sf_core::ids::{SellerId, ShopId};
use sf_core::onboarding::{
    AccountForm, BankDetails, FlowKind, FlowSettings, OtpCode, PaymentChoice, SessionSnapshot,
    ShopForm,
};
use sf_core::ports::{
    ApiError, CountdownKey, CountdownPort, MarketplaceApiPort, OnboardingEventPort,
    PaymentSetupOutcome, VerifiedSeller,
};
use sf_core::security::SecretString;

/// Marketplace fake: records every call and answers from per-endpoint scripts,
/// falling back to success when a script is empty.
#[derive(Default)]
pub struct ScriptedApi {
    calls: Mutex<Vec<&'static str>>,
    verify_registration: Mutex<VecDeque<Result<VerifiedSeller, ApiError>>>,
    create_shop: Mutex<VecDeque<Result<ShopId, ApiError>>>,
    setup_payment: Mutex<VecDeque<Result<PaymentSetupOutcome, ApiError>>>,
    payment_status: Mutex<VecDeque<Result<bool, ApiError>>>,
    verify_reset: Mutex<VecDeque<Result<(), ApiError>>>,
    reset_password: Mutex<VecDeque<Result<(), ApiError>>>,
    verify_gate: Mutex<Option<Arc<Notify>>>,
    pub seen_tokens: Mutex<Vec<Option<String>>>,
    pub seen_sellers: Mutex<Vec<SellerId>>,
    pub seen_passwords: Mutex<Vec<String>>,
}

impl ScriptedApi {
    pub fn count(&self, endpoint: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| **call == endpoint)
            .count()
    }

    pub fn script_verify_registration(&self, result: Result<VerifiedSeller, ApiError>) {
        self.verify_registration.lock().unwrap().push_back(result);
    }

    pub fn script_create_shop(&self, result: Result<ShopId, ApiError>) {
        self.create_shop.lock().unwrap().push_back(result);
    }

    pub fn script_setup_payment(&self, result: Result<PaymentSetupOutcome, ApiError>) {
        self.setup_payment.lock().unwrap().push_back(result);
    }

    pub fn script_payment_status(&self, result: Result<bool, ApiError>) {
        self.payment_status.lock().unwrap().push_back(result);
    }

    pub fn script_verify_reset(&self, result: Result<(), ApiError>) {
        self.verify_reset.lock().unwrap().push_back(result);
    }

    pub fn script_reset_password(&self, result: Result<(), ApiError>) {
        self.reset_password.lock().unwrap().push_back(result);
    }

    /// Parks every verification call until the returned handle is notified.
    pub fn gate_verification(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.verify_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    fn record(&self, endpoint: &'static str) {
        self.calls.lock().unwrap().push(endpoint);
    }

    fn record_token(&self, token: Option<&SecretString>) {
        self.seen_tokens
            .lock()
            .unwrap()
            .push(token.map(|t| t.expose().to_string()));
    }

    async fn wait_gate(&self) {
        let gate = self.verify_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }
}

pub fn rejected_code() -> ApiError {
    ApiError::Rejected {
        status: 400,
        message: "invalid otp".to_string(),
    }
}

#[async_trait]
impl MarketplaceApiPort for ScriptedApi {
    async fn send_registration_otp(&self, _account: &AccountForm) -> Result<(), ApiError> {
        self.record("send_registration_otp");
        Ok(())
    }

    async fn verify_registration_otp(
        &self,
        _account: &AccountForm,
        _code: &OtpCode,
    ) -> Result<VerifiedSeller, ApiError> {
        self.record("verify_registration_otp");
        self.wait_gate().await;
        let scripted = self.verify_registration.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(VerifiedSeller {
                seller_id: "S1".into(),
                token: SecretString::from("tok-S1"),
            })
        })
    }

    async fn create_shop(
        &self,
        token: Option<&SecretString>,
        seller_id: &SellerId,
        _shop: &ShopForm,
    ) -> Result<ShopId, ApiError> {
        self.record("create_shop");
        self.record_token(token);
        self.seen_sellers.lock().unwrap().push(seller_id.clone());
        let scripted = self.create_shop.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| Ok("H1".into()))
    }

    async fn setup_payment(
        &self,
        token: Option<&SecretString>,
        seller_id: &SellerId,
        _shop_id: &ShopId,
        _choice: &PaymentChoice,
    ) -> Result<PaymentSetupOutcome, ApiError> {
        self.record("setup_payment");
        self.record_token(token);
        self.seen_sellers.lock().unwrap().push(seller_id.clone());
        let scripted = self.setup_payment.lock().unwrap().pop_front();
        scripted.unwrap_or(Ok(PaymentSetupOutcome::Confirmed))
    }

    async fn skip_payment_setup(
        &self,
        token: Option<&SecretString>,
        _seller_id: &SellerId,
        _shop_id: &ShopId,
    ) -> Result<(), ApiError> {
        self.record("skip_payment_setup");
        self.record_token(token);
        Ok(())
    }

    async fn payment_status(
        &self,
        _token: Option<&SecretString>,
        _seller_id: &SellerId,
    ) -> Result<bool, ApiError> {
        self.record("payment_status");
        let scripted = self.payment_status.lock().unwrap().pop_front();
        scripted.unwrap_or(Ok(true))
    }

    async fn send_reset_otp(&self, _email: &str) -> Result<(), ApiError> {
        self.record("send_reset_otp");
        Ok(())
    }

    async fn verify_reset_otp(&self, _email: &str, _code: &OtpCode) -> Result<(), ApiError> {
        self.record("verify_reset_otp");
        self.wait_gate().await;
        let scripted = self.verify_reset.lock().unwrap().pop_front();
        scripted.unwrap_or(Ok(()))
    }

    async fn reset_password(&self, _email: &str, password: &SecretString) -> Result<(), ApiError> {
        self.record("reset_password");
        self.seen_passwords
            .lock()
            .unwrap()
            .push(password.expose().to_string());
        let scripted = self.reset_password.lock().unwrap().pop_front();
        scripted.unwrap_or(Ok(()))
    }
}

/// Countdown that never ticks on its own; tests fire ticks explicitly.
#[derive(Default)]
pub struct ManualCountdown {
    pub starts: Mutex<Vec<(CountdownKey, u32)>>,
    pub cancels: Mutex<Vec<FlowKind>>,
    running: Mutex<Option<(CountdownKey, mpsc::UnboundedSender<CountdownKey>)>>,
}

impl ManualCountdown {
    pub fn fire(&self, ticks: u32) {
        if let Some((key, tx)) = &*self.running.lock().unwrap() {
            for _ in 0..ticks {
                tx.send(*key).unwrap();
            }
        }
    }
}

#[async_trait]
impl CountdownPort for ManualCountdown {
    async fn start(
        &self,
        key: CountdownKey,
        seconds: u32,
        ticks: mpsc::UnboundedSender<CountdownKey>,
    ) -> anyhow::Result<()> {
        self.starts.lock().unwrap().push((key, seconds));
        *self.running.lock().unwrap() = Some((key, ticks));
        Ok(())
    }

    async fn cancel(&self, flow: FlowKind) -> anyhow::Result<()> {
        self.cancels.lock().unwrap().push(flow);
        self.running.lock().unwrap().take();
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingEvents {
    pub snapshots: Mutex<Vec<SessionSnapshot>>,
}

impl RecordingEvents {
    pub fn stages(&self) -> Vec<String> {
        let mut stages: Vec<String> = Vec::new();
        for snapshot in self.snapshots.lock().unwrap().iter() {
            if stages.last() != Some(&snapshot.stage) {
                stages.push(snapshot.stage.clone());
            }
        }
        stages
    }
}

#[async_trait]
impl OnboardingEventPort for RecordingEvents {
    async fn emit_stage_changed(&self, snapshot: SessionSnapshot) {
        self.snapshots.lock().unwrap().push(snapshot);
    }
}

pub struct Harness<O> {
    pub flow: Arc<O>,
    pub api: Arc<ScriptedApi>,
    pub countdown: Arc<ManualCountdown>,
    pub events: Arc<RecordingEvents>,
}

pub fn registration() -> Harness<RegistrationOrchestrator> {
    let events = Arc::new(RecordingEvents::default());
    let (flow, api, countdown) = registration_with_events(events.clone());
    Harness {
        flow,
        api,
        countdown,
        events,
    }
}

pub fn registration_with_events(
    events: Arc<dyn OnboardingEventPort>,
) -> (
    Arc<RegistrationOrchestrator>,
    Arc<ScriptedApi>,
    Arc<ManualCountdown>,
) {
    let api = Arc::new(ScriptedApi::default());
    let countdown = Arc::new(ManualCountdown::default());
    let coordinator = Arc::new(ProvisioningCoordinator::new(api.clone()));
    let effects = Arc::new(RegistrationEffects::new(coordinator, countdown.clone()));
    let flow = Arc::new(FlowOrchestrator::new(
        FlowContext::start(FlowSettings::default()).arc(),
        effects,
        events,
    ));
    (flow, api, countdown)
}

pub fn password_reset() -> Harness<PasswordResetOrchestrator> {
    let api = Arc::new(ScriptedApi::default());
    let countdown = Arc::new(ManualCountdown::default());
    let events = Arc::new(RecordingEvents::default());
    let coordinator = Arc::new(ProvisioningCoordinator::new(api.clone()));
    let effects = Arc::new(PasswordResetEffects::new(coordinator, countdown.clone()));
    let flow = Arc::new(FlowOrchestrator::new(
        FlowContext::start(FlowSettings::default()).arc(),
        effects,
        events.clone(),
    ));
    Harness {
        flow,
        api,
        countdown,
        events,
    }
}

pub fn account() -> AccountForm {
    AccountForm {
        name: "Ada Atelier".to_string(),
        email: "ada@atelier.test".to_string(),
        phone_number: "+44 7700 900123".to_string(),
        country: "GB".to_string(),
        password: SecretString::from("correct-horse"),
        confirm_password: SecretString::from("correct-horse"),
    }
}

pub fn shop() -> ShopForm {
    ShopForm {
        name: "Ada's Vintage".to_string(),
        bio: "Curated 70s pieces".to_string(),
        address: "1 Savile Row, London".to_string(),
        opening_hours: "Mon-Fri 10-18".to_string(),
        website: Some("https://ada.example".to_string()),
        category: "vintage".to_string(),
    }
}

pub fn manual_payment() -> PaymentChoice {
    PaymentChoice::Manual(BankDetails {
        account_holder: "Ada Atelier".to_string(),
        bank_name: "Thread Bank".to_string(),
        account_number: "12345678".to_string(),
        routing_number: "00-11-22".to_string(),
    })
}

/// Yields until `condition` holds, so spawned work can make progress.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..10_000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}
