//! Seller registration use case.
//!
//! `RegistrationOrchestrator` is the generic flow orchestrator specialised to the
//! registration machine, plus the inputs only this flow has.

mod effects;

pub use effects::RegistrationEffects;

use sf_core::onboarding::{
    AccountForm, PaymentChoice, PaymentLink, RegistrationEvent, RegistrationMachine, SessionSnapshot,
    ShopForm,
};

use crate::usecases::flow::FlowOrchestrator;

pub type RegistrationOrchestrator = FlowOrchestrator<RegistrationMachine, RegistrationEffects>;

impl FlowOrchestrator<RegistrationMachine, RegistrationEffects> {
    pub async fn submit_account(&self, form: AccountForm) -> SessionSnapshot {
        self.dispatch(RegistrationEvent::SubmitAccount(form)).await
    }

    pub async fn submit_shop(&self, form: ShopForm) -> SessionSnapshot {
        self.dispatch(RegistrationEvent::SubmitShop(form)).await
    }

    pub async fn link_payment(&self, choice: PaymentChoice) -> SessionSnapshot {
        self.dispatch(RegistrationEvent::LinkPayment(choice)).await
    }

    /// The seller is back from the provider's hosted onboarding page.
    pub async fn confirm_payment_return(&self) -> SessionSnapshot {
        self.dispatch(RegistrationEvent::ConfirmPaymentReturn).await
    }

    pub async fn skip_payment(&self) -> SessionSnapshot {
        self.dispatch(RegistrationEvent::SkipPayment).await
    }

    /// Reports a completed skip to the server, once per session. Returns `false`
    /// without any call unless the session completed with payment explicitly
    /// skipped and the skip was not reported yet.
    pub async fn acknowledge_payment_skip(&self) -> bool {
        let snapshot = self.snapshot().await;
        let (Some(seller_id), Some(shop_id)) = (snapshot.seller_id, snapshot.shop_id) else {
            return false;
        };
        if snapshot.payment != PaymentLink::ExplicitlySkipped
            || !self.effects().claim_skip_acknowledgement()
        {
            return false;
        }
        self.effects()
            .coordinator()
            .acknowledge_payment_skip(&seller_id, &shop_id)
            .await;
        true
    }
}
