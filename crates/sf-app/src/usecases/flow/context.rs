use std::sync::Arc;

use tokio::sync::Mutex;

use sf_core::onboarding::{FlowMachine, FlowSettings, OnboardingSession};

/// Shared flow context containing the session and the dispatch lock.
///
/// ## Lock Ordering
/// When acquiring both locks, acquire `dispatch_lock` first, then `session`.
/// - `dispatch_lock`: held for one transition (read, transition, write back).
///   Network effects run after it is released.
/// - `session`: used for both reading (`get_session`) and writing.
pub struct FlowContext<M: FlowMachine> {
    session: Arc<Mutex<OnboardingSession<M::Stage>>>,
    dispatch_lock: Arc<Mutex<()>>,
}

impl<M: FlowMachine> Clone for FlowContext<M> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
            dispatch_lock: Arc::clone(&self.dispatch_lock),
        }
    }
}

impl<M: FlowMachine> FlowContext<M> {
    pub fn new(initial: OnboardingSession<M::Stage>) -> Self {
        Self {
            session: Arc::new(Mutex::new(initial)),
            dispatch_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Context positioned at the machine's first stage.
    pub fn start(settings: FlowSettings) -> Self {
        Self::new(M::start(settings))
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Does NOT acquire `dispatch_lock`.
    pub async fn get_session(&self) -> OnboardingSession<M::Stage> {
        self.session.lock().await.clone()
    }

    pub async fn acquire_dispatch_lock(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.dispatch_lock.lock().await
    }

    /// Only call while holding `dispatch_lock`.
    pub async fn set_session(&self, session: OnboardingSession<M::Stage>) {
        let mut guard = self.session.lock().await;
        *guard = session;
    }
}
