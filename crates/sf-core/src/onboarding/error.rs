use serde::Serialize;

/// Local, pre-submission failures. These never reach the network layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("email address is not valid")]
    InvalidEmail,
    #[error("phone number is not valid")]
    InvalidPhone,
    #[error("password must be at least {min_len} characters")]
    PasswordTooShort { min_len: usize },
    #[error("passwords do not match")]
    PasswordMismatch,
    #[error("verification code digits must be 0-9")]
    InvalidOtpDigit,
}

/// Failure taxonomy surfaced at the stage where it happened.
///
/// Stored in the stage's `error` slot so the host can render it inline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum OnboardingError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("incorrect code, {attempts_remaining} attempts remaining")]
    OtpRejected { attempts_remaining: u32 },

    #[error("too many incorrect codes; go back and start again to request a new code")]
    OtpLocked,

    #[error("network unavailable: {0}")]
    TransientNetwork(String),

    #[error("already exists: {0}")]
    ResourceConflict(String),

    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("payment setup has not been completed with the provider yet")]
    PaymentNotConfirmed,

    #[error("a request for this step is already in progress")]
    RequestInFlight,
}

impl OnboardingError {
    /// Whether prompting the user to "try again" at the same stage makes sense.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            OnboardingError::TransientNetwork(_)
                | OnboardingError::PaymentNotConfirmed
                | OnboardingError::OtpRejected { .. }
        ) || matches!(self, OnboardingError::Server { status, .. } if *status >= 500)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_and_lockout_are_not_retryable() {
        assert!(!OnboardingError::ResourceConflict("shop".into()).is_retryable());
        assert!(!OnboardingError::OtpLocked.is_retryable());
        assert!(!OnboardingError::from(ValidationError::InvalidEmail).is_retryable());
        assert!(OnboardingError::TransientNetwork("timeout".into()).is_retryable());
    }

    #[test]
    fn only_5xx_server_errors_are_retryable() {
        let bad_gateway = OnboardingError::Server {
            status: 502,
            message: "bad gateway".into(),
        };
        let bad_request = OnboardingError::Server {
            status: 400,
            message: "category unknown".into(),
        };
        assert!(bad_gateway.is_retryable());
        assert!(!bad_request.is_retryable());
    }

    #[test]
    fn rejected_message_reports_remaining_attempts() {
        let err = OnboardingError::OtpRejected {
            attempts_remaining: 2,
        };
        assert_eq!(err.to_string(), "incorrect code, 2 attempts remaining");
    }
}
