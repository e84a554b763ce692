use tokio::sync::mpsc;

use crate::onboarding::FlowKind;

/// Identifies the countdown owned by one flow under one session generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CountdownKey {
    pub flow: FlowKind,
    pub generation: u64,
}

/// Schedules the once-per-second resend countdown.
///
/// At most one countdown runs per flow: `start` replaces any countdown already
/// running for `key.flow`. Each elapsed second is reported by sending `key` on
/// `ticks`; after `seconds` ticks the countdown ends on its own.
#[async_trait::async_trait]
pub trait CountdownPort: Send + Sync {
    async fn start(
        &self,
        key: CountdownKey,
        seconds: u32,
        ticks: mpsc::UnboundedSender<CountdownKey>,
    ) -> anyhow::Result<()>;

    /// Stops the flow's countdown, if any. Idempotent.
    async fn cancel(&self, flow: FlowKind) -> anyhow::Result<()>;
}
