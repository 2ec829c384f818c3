//! Gateway redirect URL construction.

use chrono::{DateTime, Duration, Utc};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use std::collections::HashMap;

use crate::booking::Booking;
use crate::wallet::WalletTransaction;

use super::signature::SignatureVerifier;
use super::{param, to_minor_units};

/// Minutes a payment link stays valid.
const PAYMENT_LINK_TTL_MIN: i64 = 15;

/// Gateway connection settings, configured out-of-band.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the gateway's payment page.
    pub pay_url: String,
    /// Where the gateway redirects after a booking payment.
    pub return_url: String,
    /// Where the gateway redirects after a wallet top-up.
    pub wallet_return_url: String,
    /// Merchant identifier issued by the gateway.
    pub merchant_code: String,
    /// Shared HMAC secret.
    pub secret: String,
    pub version: String,
    pub command: String,
    pub currency: String,
}

/// Builds signed redirect URLs for the payment gateway.
pub struct PaymentGateway {
    config: GatewayConfig,
    signer: SignatureVerifier,
}

impl PaymentGateway {
    pub fn new(config: GatewayConfig) -> Self {
        let signer = SignatureVerifier::new(config.secret.as_bytes().to_vec());
        Self { config, signer }
    }

    /// A verifier sharing this gateway's secret, for callback handling.
    pub fn verifier(&self) -> SignatureVerifier {
        self.signer.clone()
    }

    /// Redirect URL paying for a booking. The transaction reference is the
    /// booking's own, so the callback can be correlated back.
    pub fn booking_payment_url(
        &self,
        booking: &Booking,
        client_ip: &str,
        now: DateTime<Utc>,
    ) -> String {
        self.build_url(
            &booking.transaction_ref,
            to_minor_units(booking.total_cost),
            &format!("rental payment {}", booking.id),
            &self.config.return_url,
            client_ip,
            now,
        )
    }

    /// Redirect URL crediting a wallet. The transaction reference is the
    /// `PENDING` wallet transaction id.
    pub fn top_up_url(
        &self,
        transaction: &WalletTransaction,
        client_ip: &str,
        now: DateTime<Utc>,
    ) -> String {
        self.build_url(
            &transaction.id.to_string(),
            to_minor_units(transaction.amount),
            &format!("wallet top-up {}", transaction.id),
            &self.config.wallet_return_url,
            client_ip,
            now,
        )
    }

    fn build_url(
        &self,
        txn_ref: &str,
        amount_minor: i64,
        order_info: &str,
        return_url: &str,
        client_ip: &str,
        now: DateTime<Utc>,
    ) -> String {
        let expire = now + Duration::minutes(PAYMENT_LINK_TTL_MIN);
        let params = HashMap::from([
            (param::VERSION.to_string(), self.config.version.clone()),
            (param::COMMAND.to_string(), self.config.command.clone()),
            (param::MERCHANT.to_string(), self.config.merchant_code.clone()),
            (param::CURRENCY.to_string(), self.config.currency.clone()),
            (param::TXN_REF.to_string(), txn_ref.to_string()),
            (param::AMOUNT.to_string(), amount_minor.to_string()),
            (param::ORDER_INFO.to_string(), order_info.to_string()),
            (param::RETURN_URL.to_string(), return_url.to_string()),
            (param::CLIENT_IP.to_string(), client_ip.to_string()),
            (
                param::CREATE_TIME.to_string(),
                now.format("%Y%m%d%H%M%S").to_string(),
            ),
            (
                param::EXPIRE_TIME.to_string(),
                expire.format("%Y%m%d%H%M%S").to_string(),
            ),
        ]);

        let query = SignatureVerifier::canonical_query(&params);
        let signature = self.signer.sign(&params);
        format!(
            "{}?{}&{}={}",
            self.config.pay_url,
            query,
            param::SIGNATURE,
            utf8_percent_encode(&signature, NON_ALPHANUMERIC)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::{BookingStatus, PenaltyConfig, PenaltyKind};
    use chrono::TimeZone;
    use uuid::Uuid;

    fn config() -> GatewayConfig {
        GatewayConfig {
            pay_url: "https://gateway.example/pay".to_string(),
            return_url: "https://rentfleet.example/payments/return".to_string(),
            wallet_return_url: "https://rentfleet.example/wallet/return".to_string(),
            merchant_code: "RENTFLEET".to_string(),
            secret: "shared-secret".to_string(),
            version: "2.1.0".to_string(),
            command: "pay".to_string(),
            currency: "VND".to_string(),
        }
    }

    fn booking() -> Booking {
        let now = Utc.with_ymd_and_hms(2025, 9, 1, 8, 0, 0).unwrap();
        Booking {
            id: Uuid::new_v4(),
            renter_id: Uuid::new_v4(),
            vehicle_id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            time_start: Utc.with_ymd_and_hms(2025, 9, 21, 10, 0, 0).unwrap(),
            time_end: Utc.with_ymd_and_hms(2025, 9, 29, 10, 0, 0).unwrap(),
            address: "12 Riverside Rd".to_string(),
            phone_number: "0912345678".to_string(),
            total_cost: 4_000_000,
            penalty: PenaltyConfig {
                kind: PenaltyKind::Fixed,
                value: 100_000,
                min_cancel_hours: 48,
            },
            transaction_ref: "BOOK-1A2B3C4D".to_string(),
            status: BookingStatus::Pending,
            cancel_penalty: None,
            cancel_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn payment_url_is_signed_and_carries_minor_units() {
        let gateway = PaymentGateway::new(config());
        let now = Utc.with_ymd_and_hms(2025, 9, 1, 8, 0, 0).unwrap();
        let url = gateway.booking_payment_url(&booking(), "203.0.113.7", now);

        assert!(url.starts_with("https://gateway.example/pay?"));
        assert!(url.contains("amount=400000000"));
        assert!(url.contains("txn_ref=BOOK%2D1A2B3C4D"));
        assert!(url.contains("create_time=20250901080000"));
        assert!(url.contains("expire_time=20250901081500"));

        // the embedded signature verifies against the query parameters
        let query = url.split_once('?').unwrap().1;
        let params: HashMap<String, String> = query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .map(|(k, v)| {
                (
                    k.to_string(),
                    percent_encoding::percent_decode_str(v)
                        .decode_utf8()
                        .unwrap()
                        .into_owned(),
                )
            })
            .collect();
        assert!(gateway.verifier().verify(&params));
    }
}
