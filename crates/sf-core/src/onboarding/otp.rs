//! One-time-passcode challenge.
//!
//! Owns the six-slot entry buffer, the focused slot, the rejected-attempt counter,
//! and the in-flight flags for verification and resend. It never judges whether a
//! code is correct; only the server does.

use serde::{Deserialize, Serialize};

use super::error::ValidationError;
use super::lockout::LockoutPolicy;
use super::resend_timer::ResendTimer;

pub const OTP_LENGTH: usize = 6;

/// A complete six-digit code, ready to be sent for verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OtpCode(String);

impl OtpCode {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        if raw.len() == OTP_LENGTH && raw.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(raw.to_string()))
        } else {
            Err(ValidationError::InvalidOtpDigit)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Result of [`OtpChallenge::enter_digit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DigitEntry {
    /// Input was not a single digit or empty string; nothing changed.
    Ignored,
    /// Slot updated. `submit` carries the code when this entry completed the
    /// buffer and started a verification.
    Accepted { submit: Option<OtpCode> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitBlocked {
    Locked,
    InFlight,
    Incomplete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResendBlocked {
    Locked,
    CoolingDown { remaining_secs: u32 },
    InFlight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionOutcome {
    Retry { attempts_remaining: u32 },
    Locked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpChallenge {
    digits: [Option<char>; OTP_LENGTH],
    focused: usize,
    attempt_count: u32,
    locked: bool,
    verifying: bool,
    resending: bool,
    resend_timer: ResendTimer,
    policy: LockoutPolicy,
}

impl OtpChallenge {
    /// Challenge for a code that was just sent: the resend cooldown is running.
    pub fn issued(policy: LockoutPolicy, cooldown_secs: u32) -> Self {
        Self::with_timer(policy, ResendTimer::started(cooldown_secs))
    }

    /// Challenge re-entered without a fresh code (resend immediately available).
    pub fn awaiting_resend(policy: LockoutPolicy) -> Self {
        Self::with_timer(policy, ResendTimer::idle())
    }

    fn with_timer(policy: LockoutPolicy, resend_timer: ResendTimer) -> Self {
        Self {
            digits: [None; OTP_LENGTH],
            focused: 0,
            attempt_count: 0,
            locked: false,
            verifying: false,
            resending: false,
            resend_timer,
            policy,
        }
    }

    pub fn enter_digit(&mut self, index: usize, value: &str) -> DigitEntry {
        if index >= OTP_LENGTH {
            return DigitEntry::Ignored;
        }
        let mut chars = value.chars();
        let digit = match (chars.next(), chars.next()) {
            (None, _) => None,
            (Some(c), None) if c.is_ascii_digit() => Some(c),
            _ => return DigitEntry::Ignored,
        };

        self.digits[index] = digit;
        if digit.is_some() && index < OTP_LENGTH - 1 {
            self.focused = index + 1;
        } else {
            self.focused = index;
        }

        let submit = if self.is_complete() {
            self.begin_submit().ok()
        } else {
            None
        };
        DigitEntry::Accepted { submit }
    }

    /// Backspace: clears a filled slot, or moves focus left from an empty one.
    pub fn delete_digit(&mut self, index: usize) {
        if index >= OTP_LENGTH {
            return;
        }
        if self.digits[index].is_some() {
            self.digits[index] = None;
            self.focused = index;
        } else if index > 0 {
            self.focused = index - 1;
        }
    }

    /// Marks a verification as in flight and returns the code to send.
    pub fn begin_submit(&mut self) -> Result<OtpCode, SubmitBlocked> {
        if self.locked || !self.policy.can_attempt(self.attempt_count) {
            self.locked = true;
            return Err(SubmitBlocked::Locked);
        }
        if self.verifying {
            return Err(SubmitBlocked::InFlight);
        }
        let code = self.code().ok_or(SubmitBlocked::Incomplete)?;
        self.verifying = true;
        Ok(code)
    }

    pub fn verification_succeeded(&mut self) {
        self.verifying = false;
        self.attempt_count = 0;
        self.resend_timer.cancel();
    }

    /// The server said the code is wrong. Clears the buffer for re-entry.
    pub fn verification_rejected(&mut self) -> RejectionOutcome {
        self.verifying = false;
        self.attempt_count += 1;
        self.clear_digits();
        if self.policy.can_attempt(self.attempt_count) {
            RejectionOutcome::Retry {
                attempts_remaining: self.policy.attempts_remaining(self.attempt_count),
            }
        } else {
            self.locked = true;
            RejectionOutcome::Locked
        }
    }

    /// Transport failure: no attempt consumed, digits kept so the user can resubmit.
    pub fn verification_interrupted(&mut self) {
        self.verifying = false;
    }

    pub fn begin_resend(&mut self) -> Result<(), ResendBlocked> {
        if self.locked {
            return Err(ResendBlocked::Locked);
        }
        if self.resend_timer.is_active() {
            return Err(ResendBlocked::CoolingDown {
                remaining_secs: self.resend_timer.remaining(),
            });
        }
        if self.resending || self.verifying {
            return Err(ResendBlocked::InFlight);
        }
        self.resending = true;
        Ok(())
    }

    pub fn resend_succeeded(&mut self, cooldown_secs: u32) {
        self.resending = false;
        self.clear_digits();
        self.resend_timer.start(cooldown_secs);
    }

    pub fn resend_failed(&mut self) {
        self.resending = false;
    }

    /// One cooldown unit elapsed. Returns `true` when resend just became available.
    pub fn tick(&mut self) -> bool {
        self.resend_timer.tick()
    }

    pub fn cancel_countdown(&mut self) {
        self.resend_timer.cancel();
    }

    fn clear_digits(&mut self) {
        self.digits = [None; OTP_LENGTH];
        self.focused = 0;
    }

    fn is_complete(&self) -> bool {
        self.digits.iter().all(Option::is_some)
    }

    pub fn code(&self) -> Option<OtpCode> {
        self.digits
            .iter()
            .copied()
            .collect::<Option<String>>()
            .map(OtpCode)
    }

    pub fn digits(&self) -> &[Option<char>; OTP_LENGTH] {
        &self.digits
    }

    pub fn focused_slot(&self) -> usize {
        self.focused
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    pub fn attempts_remaining(&self) -> u32 {
        self.policy.attempts_remaining(self.attempt_count)
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn is_verifying(&self) -> bool {
        self.verifying
    }

    pub fn is_resending(&self) -> bool {
        self.resending
    }

    pub fn resend_timer(&self) -> &ResendTimer {
        &self.resend_timer
    }
}
