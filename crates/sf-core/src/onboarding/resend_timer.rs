//! Resend cooldown countdown.
//!
//! Pure counter: the host's scheduler calls [`ResendTimer::tick`] once per second.
//! Starting always replaces the previous countdown, so at most one is active.

use serde::{Deserialize, Serialize};

pub const DEFAULT_RESEND_COOLDOWN_SECS: u32 = 60;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResendTimer {
    remaining: u32,
}

impl ResendTimer {
    /// A timer that is already idle (resend immediately available).
    pub fn idle() -> Self {
        Self { remaining: 0 }
    }

    /// A timer started at `duration_secs`.
    pub fn started(duration_secs: u32) -> Self {
        let mut timer = Self::idle();
        timer.start(duration_secs);
        timer
    }

    /// (Re)starts the countdown, discarding any running one.
    pub fn start(&mut self, duration_secs: u32) {
        self.remaining = duration_secs;
    }

    /// Advances one unit. Returns `true` on the tick that reaches zero.
    pub fn tick(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        self.remaining == 0
    }

    pub fn cancel(&mut self) {
        self.remaining = 0;
    }

    pub fn is_active(&self) -> bool {
        self.remaining > 0
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }
}
