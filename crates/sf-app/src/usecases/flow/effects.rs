use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::warn;

use sf_core::onboarding::{FlowMachine, OnboardingSession};
use sf_core::ports::{CountdownKey, CountdownPort};

/// Where an action runs: the generation it was issued under and the tick channel
/// the countdown reports to.
#[derive(Clone)]
pub struct EffectScope {
    pub generation: u64,
    pub ticks: mpsc::UnboundedSender<CountdownKey>,
}

/// Executes the side effects a flow machine asks for.
#[async_trait::async_trait]
pub trait FlowEffects<M: FlowMachine>: Send + Sync + 'static {
    /// Called under the dispatch lock, before the transition. Stores the payloads
    /// later actions replay (form drafts, secrets). Must not block.
    fn capture(&self, session: &OnboardingSession<M::Stage>, event: &M::Event);

    /// Runs one action and returns the events reporting its outcome. Results must
    /// be tagged with `scope.generation`.
    async fn execute(&self, action: M::Action, scope: &EffectScope) -> Vec<M::Event>;
}

/// Starts the flow's resend countdown; scheduler failures only cost the ticks.
pub(crate) async fn start_countdown<M: FlowMachine>(
    countdown: &Arc<dyn CountdownPort>,
    scope: &EffectScope,
    seconds: u32,
) {
    let key = CountdownKey {
        flow: M::KIND,
        generation: scope.generation,
    };
    if let Err(err) = countdown.start(key, seconds, scope.ticks.clone()).await {
        warn!(flow = %M::KIND, error = %err, "failed to start resend countdown");
    }
}

pub(crate) async fn cancel_countdown<M: FlowMachine>(countdown: &Arc<dyn CountdownPort>) {
    if let Err(err) = countdown.cancel(M::KIND).await {
        warn!(flow = %M::KIND, error = %err, "failed to cancel resend countdown");
    }
}
