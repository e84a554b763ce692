pub mod config;
pub mod events;
pub mod tracing;
pub mod wiring;

pub use config::{default_config_path, resolve_config};
pub use events::TracingEventPort;
pub use wiring::{wire, wire_with, OnboardingApp};
