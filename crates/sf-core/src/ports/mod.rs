//! Port interfaces for the application layer.
//!
//! Ports are the contract between the onboarding use cases in `sf-app` and the
//! adapters in `sf-infra` (HTTP client, countdown scheduler) or the host (event sink).

mod countdown;
mod marketplace;
mod onboarding_event;

pub use countdown::{CountdownKey, CountdownPort};
pub use marketplace::{ApiError, MarketplaceApiPort, PaymentSetupOutcome, VerifiedSeller};
pub use onboarding_event::OnboardingEventPort;
