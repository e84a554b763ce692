//! Flow orchestrator.
//!
//! This module coordinates a flow state machine and its side effects.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, Instrument};

use sf_core::onboarding::{FlowEvent, FlowMachine, OtpEvent, SessionSnapshot, StageView};
use sf_core::ports::{CountdownKey, OnboardingEventPort};

use super::context::FlowContext;
use super::effects::{EffectScope, FlowEffects};

/// Orchestrator that drives one onboarding flow's session and side effects.
///
/// Transitions are serialized; the network calls they trigger are not. A result
/// that arrives after the user went back or restarted carries an old generation
/// and is dropped by the machine.
pub struct FlowOrchestrator<M: FlowMachine, E: FlowEffects<M>> {
    context: Arc<FlowContext<M>>,
    effects: Arc<E>,
    event_port: Arc<dyn OnboardingEventPort>,
    ticks_tx: mpsc::UnboundedSender<CountdownKey>,
    ticks_rx: Mutex<Option<mpsc::UnboundedReceiver<CountdownKey>>>,
}

impl<M: FlowMachine, E: FlowEffects<M>> FlowOrchestrator<M, E> {
    pub fn new(
        context: Arc<FlowContext<M>>,
        effects: Arc<E>,
        event_port: Arc<dyn OnboardingEventPort>,
    ) -> Self {
        let (ticks_tx, ticks_rx) = mpsc::unbounded_channel();
        Self {
            context,
            effects,
            event_port,
            ticks_tx,
            ticks_rx: Mutex::new(Some(ticks_rx)),
        }
    }

    pub fn effects(&self) -> &Arc<E> {
        &self.effects
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.context.get_session().await.snapshot(M::KIND)
    }

    /// Feeds one event through the machine, then runs the resulting actions and
    /// every follow-up event they produce. Returns the snapshot after the last step.
    pub async fn dispatch(&self, event: M::Event) -> SessionSnapshot {
        let span = info_span!("usecase.onboarding_flow.dispatch", flow = %M::KIND, event = ?event);
        async {
            let mut pending_events = VecDeque::from([event]);

            while let Some(event) = pending_events.pop_front() {
                let (snapshot, actions, generation) = self.step(event).await;
                self.event_port.emit_stage_changed(snapshot).await;

                let scope = EffectScope {
                    generation,
                    ticks: self.ticks_tx.clone(),
                };
                for action in actions {
                    debug!(?action, "onboarding executing action");
                    pending_events.extend(self.effects.execute(action, &scope).await);
                }
            }

            self.snapshot().await
        }
        .instrument(span)
        .await
    }

    async fn step(&self, event: M::Event) -> (SessionSnapshot, Vec<M::Action>, u64) {
        let _dispatch_guard = self.context.acquire_dispatch_lock().await;
        let current = self.context.get_session().await;
        self.effects.capture(&current, &event);

        let from = current.stage.name();
        let event_name = format!("{:?}", event);
        let (next, actions) = M::transition(current, event);
        info!(from, to = next.stage.name(), event = %event_name, "onboarding stage transition");

        let snapshot = next.snapshot(M::KIND);
        let generation = next.generation;
        self.context.set_session(next).await;
        (snapshot, actions, generation)
    }

    /// Consumes countdown ticks and feeds them back as events. Call once; later
    /// calls return `None`.
    pub async fn spawn_tick_pump(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let mut ticks = self.ticks_rx.lock().await.take()?;
        let orchestrator = Arc::clone(self);
        Some(tokio::spawn(async move {
            while let Some(key) = ticks.recv().await {
                if key.flow == M::KIND {
                    orchestrator
                        .dispatch(M::Event::countdown_tick(key.generation))
                        .await;
                }
            }
        }))
    }

    // Inputs every flow shares.

    pub async fn enter_digit(&self, index: usize, value: impl Into<String>) -> SessionSnapshot {
        self.dispatch(M::Event::otp(OtpEvent::DigitEntered {
            index,
            value: value.into(),
        }))
        .await
    }

    pub async fn delete_digit(&self, index: usize) -> SessionSnapshot {
        self.dispatch(M::Event::otp(OtpEvent::DigitDeleted { index }))
            .await
    }

    pub async fn submit_code(&self) -> SessionSnapshot {
        self.dispatch(M::Event::otp(OtpEvent::Submit)).await
    }

    pub async fn resend_code(&self) -> SessionSnapshot {
        self.dispatch(M::Event::otp(OtpEvent::Resend)).await
    }

    pub async fn retry(&self) -> SessionSnapshot {
        self.dispatch(M::Event::retry()).await
    }

    pub async fn back(&self) -> SessionSnapshot {
        self.dispatch(M::Event::back()).await
    }

    pub async fn restart(&self) -> SessionSnapshot {
        self.dispatch(M::Event::restart()).await
    }
}
