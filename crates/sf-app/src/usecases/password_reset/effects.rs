use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use sf_core::onboarding::{
    NewPasswordForm, OnboardingSession, OtpEvent, PasswordResetAction, PasswordResetEvent,
    PasswordResetMachine, PasswordResetStage, ValidationError,
};
use sf_core::ports::CountdownPort;

use crate::usecases::flow::{effects, EffectScope, FlowEffects};
use crate::usecases::provisioning::{OtpVerdict, ProvisioningCoordinator};

/// Side-effect executor for [`PasswordResetMachine`].
pub struct PasswordResetEffects {
    coordinator: Arc<ProvisioningCoordinator>,
    countdown: Arc<dyn CountdownPort>,
    new_password: Mutex<Option<NewPasswordForm>>,
}

impl PasswordResetEffects {
    pub fn new(coordinator: Arc<ProvisioningCoordinator>, countdown: Arc<dyn CountdownPort>) -> Self {
        Self {
            coordinator,
            countdown,
            new_password: Mutex::new(None),
        }
    }

    fn new_password(&self) -> std::sync::MutexGuard<'_, Option<NewPasswordForm>> {
        self.new_password
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait::async_trait]
impl FlowEffects<PasswordResetMachine> for PasswordResetEffects {
    fn capture(&self, session: &OnboardingSession<PasswordResetStage>, event: &PasswordResetEvent) {
        if let (
            PasswordResetStage::ResettingPassword {
                in_flight: false, ..
            },
            PasswordResetEvent::SubmitNewPassword(form),
        ) = (&session.stage, event)
        {
            *self.new_password() = Some(form.duplicate());
        }
    }

    async fn execute(&self, action: PasswordResetAction, scope: &EffectScope) -> Vec<PasswordResetEvent> {
        let generation = scope.generation;
        match action {
            PasswordResetAction::SendResetOtp { email } => {
                vec![match self.coordinator.send_reset_otp(&email).await {
                    Ok(()) => PasswordResetEvent::ResetOtpSent { generation },
                    Err(error) => PasswordResetEvent::ResetOtpSendFailed { generation, error },
                }]
            }
            PasswordResetAction::ResendResetOtp { email } => {
                let otp = match self.coordinator.send_reset_otp(&email).await {
                    Ok(()) => OtpEvent::ResendSucceeded { generation },
                    Err(error) => OtpEvent::ResendFailed { generation, error },
                };
                vec![PasswordResetEvent::Otp(otp)]
            }
            PasswordResetAction::VerifyResetOtp { email, code } => {
                vec![match self.coordinator.verify_reset_otp(&email, &code).await {
                    Ok(OtpVerdict::Accepted(())) => PasswordResetEvent::ResetOtpVerified { generation },
                    Ok(OtpVerdict::Rejected) => {
                        PasswordResetEvent::Otp(OtpEvent::Rejected { generation })
                    }
                    Err(error) => {
                        PasswordResetEvent::Otp(OtpEvent::Interrupted { generation, error })
                    }
                }]
            }
            PasswordResetAction::StartCountdown { seconds } => {
                effects::start_countdown::<PasswordResetMachine>(&self.countdown, scope, seconds)
                    .await;
                Vec::new()
            }
            PasswordResetAction::CancelCountdown => {
                effects::cancel_countdown::<PasswordResetMachine>(&self.countdown).await;
                Vec::new()
            }
            PasswordResetAction::ResetPassword { email } => {
                let form = self.new_password().as_ref().map(NewPasswordForm::duplicate);
                let result = match form {
                    Some(form) => self.coordinator.reset_password(&email, &form.password).await,
                    None => Err(ValidationError::MissingField("new password").into()),
                };
                vec![match result {
                    Ok(()) => PasswordResetEvent::PasswordReset { generation },
                    Err(error) => PasswordResetEvent::PasswordResetFailed { generation, error },
                }]
            }
            PasswordResetAction::DiscardDrafts => {
                debug!("discarding password reset draft");
                self.new_password().take();
                Vec::new()
            }
        }
    }
}
