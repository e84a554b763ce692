//! Attempt-limited verification policy.
//!
//! Lockout has no expiry: once reached it holds until the challenge is discarded
//! (back-navigation or restart).

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_OTP_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockoutPolicy {
    max_attempts: u32,
}

impl LockoutPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether a verification attempt may be issued after `attempt_count` rejections.
    pub fn can_attempt(&self, attempt_count: u32) -> bool {
        attempt_count < self.max_attempts
    }

    pub fn attempts_remaining(&self, attempt_count: u32) -> u32 {
        self.max_attempts.saturating_sub(attempt_count)
    }
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_OTP_ATTEMPTS)
    }
}
