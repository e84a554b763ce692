//! Generic flow orchestration.
//!
//! One dispatch loop serves both onboarding flows; per-flow behavior lives in a
//! [`FlowEffects`] implementation.

mod context;
pub(crate) mod effects;
mod orchestrator;

pub use context::FlowContext;
pub use effects::{EffectScope, FlowEffects};
pub use orchestrator::FlowOrchestrator;
