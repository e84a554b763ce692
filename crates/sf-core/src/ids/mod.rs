//! ID type wrappers for type safety.
//!
//! Identifiers are assigned by the marketplace backend; the client never mints them.

mod id_macro;

use serde::{Deserialize, Serialize};

use id_macro::impl_id;

/// Seller account identifier, returned by OTP verification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SellerId(String);

/// Shop identifier, returned by shop creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShopId(String);

impl_id!(SellerId, ShopId);
