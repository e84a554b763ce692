use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::time::{sleep, Duration};
use tracing::debug;

use sf_core::onboarding::FlowKind;
use sf_core::ports::{CountdownKey, CountdownPort};

/// One spawned task per flow, sleeping a second between ticks.
pub struct TokioCountdown {
    tasks: Arc<Mutex<HashMap<FlowKind, tokio::task::AbortHandle>>>,
}

impl TokioCountdown {
    pub fn new() -> Self {
        Self {
            tasks: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl Default for TokioCountdown {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl CountdownPort for TokioCountdown {
    async fn start(
        &self,
        key: CountdownKey,
        seconds: u32,
        ticks: mpsc::UnboundedSender<CountdownKey>,
    ) -> anyhow::Result<()> {
        let tasks = Arc::clone(&self.tasks);

        let mut tasks_guard = self.tasks.lock().await;
        if let Some(existing) = tasks_guard.remove(&key.flow) {
            existing.abort();
        }

        let handle = tokio::spawn(async move {
            for _ in 0..seconds {
                sleep(Duration::from_secs(1)).await;
                if ticks.send(key).is_err() {
                    break;
                }
            }
            tasks.lock().await.remove(&key.flow);
        });

        tasks_guard.insert(key.flow, handle.abort_handle());
        debug!(flow = %key.flow, generation = key.generation, seconds, "countdown started");
        Ok(())
    }

    async fn cancel(&self, flow: FlowKind) -> anyhow::Result<()> {
        let mut tasks_guard = self.tasks.lock().await;
        if let Some(handle) = tasks_guard.remove(&flow) {
            handle.abort();
            debug!(flow = %flow, "countdown cancelled");
        }
        Ok(())
    }
}
