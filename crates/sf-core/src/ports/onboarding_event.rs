use crate::onboarding::SessionSnapshot;

#[async_trait::async_trait]
pub trait OnboardingEventPort: Send + Sync {
    async fn emit_stage_changed(&self, snapshot: SessionSnapshot);
}
