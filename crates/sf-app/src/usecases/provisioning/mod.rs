mod coordinator;

pub use coordinator::{Operation, OtpVerdict, ProvisioningCoordinator};
