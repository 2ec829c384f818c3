//! Payment gateway integration.
//!
//! The gateway is an external collaborator reached over redirect URLs; it
//! reports outcomes through signed HTTP GET callbacks. This module builds
//! the outbound URLs and authenticates the inbound callbacks. Amounts on
//! the wire are in minor units (whole units × 100).

pub mod gateway;
pub mod signature;

pub use gateway::{GatewayConfig, PaymentGateway};
pub use signature::SignatureVerifier;

/// Wire parameter names shared by redirect URLs and callbacks.
pub mod param {
    /// Amount in minor units.
    pub const AMOUNT: &str = "amount";
    /// Transaction reference correlating gateway and engine records.
    pub const TXN_REF: &str = "txn_ref";
    /// Gateway outcome code; [`super::SUCCESS_CODE`] means paid.
    pub const RESPONSE_CODE: &str = "resp_code";
    /// Keyed-hash signature over every other parameter.
    pub const SIGNATURE: &str = "signature";
    pub const MERCHANT: &str = "merchant";
    pub const VERSION: &str = "version";
    pub const COMMAND: &str = "command";
    pub const CURRENCY: &str = "currency";
    pub const ORDER_INFO: &str = "order_info";
    pub const CREATE_TIME: &str = "create_time";
    pub const EXPIRE_TIME: &str = "expire_time";
    pub const CLIENT_IP: &str = "client_ip";
    pub const RETURN_URL: &str = "return_url";
}

/// Gateway outcome code for a successful payment.
pub const SUCCESS_CODE: &str = "00";

/// Convert a whole-unit amount to the gateway's minor units.
pub fn to_minor_units(amount: i64) -> i64 {
    amount.saturating_mul(100)
}

/// Convert a gateway minor-unit amount back to whole units. Returns `None`
/// when the value is not a whole number of units.
pub fn from_minor_units(minor: i64) -> Option<i64> {
    (minor % 100 == 0).then_some(minor / 100)
}
