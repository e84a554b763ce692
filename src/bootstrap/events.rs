use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::{debug, info};

use sf_core::onboarding::{FlowKind, SessionSnapshot};
use sf_core::ports::OnboardingEventPort;

/// Event port for the terminal host: stage changes are logged, everything else
/// (digit entry, countdown ticks) only at debug level.
#[derive(Default)]
pub struct TracingEventPort {
    last_stage: Mutex<HashMap<FlowKind, String>>,
}

impl TracingEventPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `snapshot` and reports whether its stage differs from the last one seen.
    fn stage_changed(&self, snapshot: &SessionSnapshot) -> bool {
        let mut last = self
            .last_stage
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        match last.insert(snapshot.flow, snapshot.stage.clone()) {
            Some(previous) => previous != snapshot.stage,
            None => true,
        }
    }
}

#[async_trait]
impl OnboardingEventPort for TracingEventPort {
    async fn emit_stage_changed(&self, snapshot: SessionSnapshot) {
        if self.stage_changed(&snapshot) {
            info!(
                flow = %snapshot.flow,
                stage = %snapshot.stage,
                error = snapshot.error.as_deref().unwrap_or(""),
                "onboarding stage changed"
            );
        } else {
            debug!(flow = %snapshot.flow, stage = %snapshot.stage, busy = snapshot.busy, "onboarding snapshot");
        }
    }
}
