//! # sf-core
//!
//! Core domain models and onboarding state machines for the storefront marketplace.
//!
//! This crate contains pure business logic without any infrastructure dependencies:
//! the OTP challenge and its lockout and resend rules, the registration and
//! password-reset stage machines, and the ports the application layer drives.

pub mod config;
pub mod ids;
pub mod onboarding;
pub mod ports;
pub mod security;

// Re-export commonly used types at the crate root
pub use config::OnboardingConfig;
pub use ids::{SellerId, ShopId};
pub use onboarding::{FlowKind, FlowMachine, OnboardingError, SessionSnapshot, ValidationError};
pub use security::SecretString;
