//! Password reset use case.

mod effects;

pub use effects::PasswordResetEffects;

use sf_core::onboarding::{NewPasswordForm, PasswordResetEvent, PasswordResetMachine, SessionSnapshot};

use crate::usecases::flow::FlowOrchestrator;

pub type PasswordResetOrchestrator = FlowOrchestrator<PasswordResetMachine, PasswordResetEffects>;

impl FlowOrchestrator<PasswordResetMachine, PasswordResetEffects> {
    pub async fn submit_email(&self, email: impl Into<String>) -> SessionSnapshot {
        self.dispatch(PasswordResetEvent::SubmitEmail {
            email: email.into(),
        })
        .await
    }

    pub async fn submit_new_password(&self, form: NewPasswordForm) -> SessionSnapshot {
        self.dispatch(PasswordResetEvent::SubmitNewPassword(form))
            .await
    }
}
