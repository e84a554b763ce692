//! Dependency assembly.
//!
//! The only place that knows both the adapters in `sf-infra` and the use cases in
//! `sf-app`. Assembly only: no decisions about what the flows do.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::warn;

use sf_app::usecases::flow::{FlowContext, FlowOrchestrator};
use sf_app::{
    PasswordResetEffects, PasswordResetOrchestrator, ProvisioningCoordinator, RegistrationEffects,
    RegistrationOrchestrator,
};
use sf_core::onboarding::FlowSettings;
use sf_core::ports::{CountdownPort, MarketplaceApiPort, OnboardingEventPort};
use sf_core::OnboardingConfig;
use sf_infra::{HttpMarketplaceApi, TokioCountdown};

/// Both onboarding flows, ready to take input.
///
/// Owns the countdown tick pumps; they stop on [`shutdown`](Self::shutdown) or drop.
pub struct OnboardingApp {
    pub registration: Arc<RegistrationOrchestrator>,
    pub password_reset: Arc<PasswordResetOrchestrator>,
    tick_pumps: Vec<JoinHandle<()>>,
}

impl OnboardingApp {
    /// Stops the tick pumps and waits for them to exit.
    pub async fn shutdown(&mut self) {
        for pump in &self.tick_pumps {
            pump.abort();
        }
        for pump in self.tick_pumps.drain(..) {
            if let Err(err) = pump.await {
                if !err.is_cancelled() {
                    warn!(error = %err, "countdown tick pump failed");
                }
            }
        }
    }

    pub fn tick_pumps_running(&self) -> usize {
        self.tick_pumps
            .iter()
            .filter(|pump| !pump.is_finished())
            .count()
    }
}

impl Drop for OnboardingApp {
    fn drop(&mut self) {
        for pump in &self.tick_pumps {
            pump.abort();
        }
    }
}

/// Builds the HTTP and countdown adapters from `config` and wires both flows.
///
/// Must run inside a tokio runtime: each flow's countdown tick pump is spawned here.
pub async fn wire(
    config: &OnboardingConfig,
    events: Arc<dyn OnboardingEventPort>,
) -> anyhow::Result<OnboardingApp> {
    let api: Arc<dyn MarketplaceApiPort> = Arc::new(HttpMarketplaceApi::new(config)?);
    let countdown: Arc<dyn CountdownPort> = Arc::new(TokioCountdown::new());
    Ok(wire_with(config, api, countdown, events).await)
}

/// Same as [`wire`] with the ports supplied by the caller.
pub async fn wire_with(
    config: &OnboardingConfig,
    api: Arc<dyn MarketplaceApiPort>,
    countdown: Arc<dyn CountdownPort>,
    events: Arc<dyn OnboardingEventPort>,
) -> OnboardingApp {
    let settings = FlowSettings::from(config);

    // Separate coordinators: the registration session token must not be
    // cleared by a password-reset restart.
    let registration = Arc::new(FlowOrchestrator::new(
        FlowContext::start(settings).arc(),
        Arc::new(RegistrationEffects::new(
            Arc::new(ProvisioningCoordinator::new(Arc::clone(&api))),
            Arc::clone(&countdown),
        )),
        Arc::clone(&events),
    ));
    let password_reset = Arc::new(FlowOrchestrator::new(
        FlowContext::start(settings).arc(),
        Arc::new(PasswordResetEffects::new(
            Arc::new(ProvisioningCoordinator::new(api)),
            countdown,
        )),
        events,
    ));

    let tick_pumps = [
        registration.spawn_tick_pump().await,
        password_reset.spawn_tick_pump().await,
    ]
    .into_iter()
    .flatten()
    .collect();

    OnboardingApp {
        registration,
        password_reset,
        tick_pumps,
    }
}
