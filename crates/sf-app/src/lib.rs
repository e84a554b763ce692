//! Storefront onboarding application layer
//!
//! Drives the pure flow machines from `sf-core`: runs their actions against the
//! marketplace API, schedules the resend countdown, and publishes snapshots.

pub mod usecases;

pub use usecases::flow::FlowOrchestrator;
pub use usecases::password_reset::{PasswordResetEffects, PasswordResetOrchestrator};
pub use usecases::provisioning::ProvisioningCoordinator;
pub use usecases::registration::{RegistrationEffects, RegistrationOrchestrator};
