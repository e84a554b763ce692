pub mod flow;
pub mod password_reset;
pub mod provisioning;
pub mod registration;
