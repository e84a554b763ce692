//! Form payloads collected by the onboarding stages, and their local validation.
//!
//! Validation runs before anything is sent; a failure here is a [`ValidationError`]
//! and never reaches the network layer.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::error::ValidationError;
use crate::security::SecretString;

pub const MIN_PASSWORD_LEN: usize = 8;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9][0-9 \-]{6,18}$").expect("valid phone regex"));

/// Seller account fields; the email is the OTP contact.
#[derive(Debug)]
pub struct AccountForm {
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub country: String,
    pub password: SecretString,
    pub confirm_password: SecretString,
}

impl AccountForm {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("name", &self.name)?;
        validate_email(&self.email)?;
        require("phone number", &self.phone_number)?;
        if !PHONE_RE.is_match(self.phone_number.trim()) {
            return Err(ValidationError::InvalidPhone);
        }
        require("country", &self.country)?;
        validate_new_password(&self.password, &self.confirm_password)
    }

    /// Copy used when the stored draft must be replayed (resend).
    pub fn duplicate(&self) -> Self {
        Self {
            name: self.name.clone(),
            email: self.email.clone(),
            phone_number: self.phone_number.clone(),
            country: self.country.clone(),
            password: self.password.duplicate(),
            confirm_password: self.confirm_password.duplicate(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopForm {
    pub name: String,
    pub bio: String,
    pub address: String,
    pub opening_hours: String,
    pub website: Option<String>,
    pub category: String,
}

impl ShopForm {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("shop name", &self.name)?;
        require("address", &self.address)?;
        require("opening hours", &self.opening_hours)?;
        require("category", &self.category)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankDetails {
    pub account_holder: String,
    pub bank_name: String,
    pub account_number: String,
    pub routing_number: String,
}

/// How the seller wants to get paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum PaymentChoice {
    /// Hosted provider onboarding; the server answers with a redirect URL.
    Provider { provider: String },
    /// Manual bank transfer; the server confirms directly.
    Manual(BankDetails),
}

impl PaymentChoice {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            PaymentChoice::Provider { provider } => require("payment provider", provider),
            PaymentChoice::Manual(bank) => {
                require("account holder", &bank.account_holder)?;
                require("bank name", &bank.bank_name)?;
                require("account number", &bank.account_number)?;
                require("routing number", &bank.routing_number)
            }
        }
    }
}

/// New password entered at the end of the reset flow.
#[derive(Debug)]
pub struct NewPasswordForm {
    pub password: SecretString,
    pub confirm_password: SecretString,
}

impl NewPasswordForm {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_new_password(&self.password, &self.confirm_password)
    }

    pub fn duplicate(&self) -> Self {
        Self {
            password: self.password.duplicate(),
            confirm_password: self.confirm_password.duplicate(),
        }
    }
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    require("email", email)?;
    if EMAIL_RE.is_match(email.trim()) {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail)
    }
}

fn validate_new_password(
    password: &SecretString,
    confirm: &SecretString,
) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::MissingField("password"));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort {
            min_len: MIN_PASSWORD_LEN,
        });
    }
    if password != confirm {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(())
}

fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(())
    }
}
