//! Integration tests for gateway callback authentication.

use proptest::prelude::*;
use rentfleet::payment::{PaymentGateway, GatewayConfig, SignatureVerifier, param};
use std::collections::HashMap;

fn verifier() -> SignatureVerifier {
    SignatureVerifier::new("integration-secret")
}

fn signed(params: &mut HashMap<String, String>) {
    let sig = verifier().sign(params);
    params.insert(param::SIGNATURE.to_string(), sig);
}

#[test]
fn callback_round_trip_verifies() {
    let mut params = HashMap::from([
        (param::TXN_REF.to_string(), "BOOK-00C0FFEE".to_string()),
        (param::AMOUNT.to_string(), "150000000".to_string()),
        (param::RESPONSE_CODE.to_string(), "00".to_string()),
    ]);
    signed(&mut params);
    assert!(verifier().verify(&params));
}

#[test]
fn gateway_urls_verify_with_the_same_secret() {
    let gateway = PaymentGateway::new(GatewayConfig {
        pay_url: "https://gateway.example/pay".to_string(),
        return_url: "https://api.example/payments/callback".to_string(),
        wallet_return_url: "https://api.example/payments/top-up/callback".to_string(),
        merchant_code: "MERCHANT1".to_string(),
        secret: "integration-secret".to_string(),
        version: "2.1.0".to_string(),
        command: "pay".to_string(),
        currency: "VND".to_string(),
    });
    // the verifier handed to the settlement coordinator shares the secret
    let shared = gateway.verifier();
    let mut params = HashMap::from([
        (param::TXN_REF.to_string(), "BOOK-12345678".to_string()),
        (param::AMOUNT.to_string(), "42".to_string()),
    ]);
    let sig = shared.sign(&params);
    params.insert(param::SIGNATURE.to_string(), sig);
    assert!(verifier().verify(&params));
}

proptest! {
    /// Flipping any single character of the signature must fail
    /// verification.
    #[test]
    fn single_character_flips_are_rejected(flip_at in 0usize..128) {
        let mut params = HashMap::from([
            (param::TXN_REF.to_string(), "BOOK-00C0FFEE".to_string()),
            (param::AMOUNT.to_string(), "150000000".to_string()),
            (param::RESPONSE_CODE.to_string(), "00".to_string()),
        ]);
        signed(&mut params);

        let sig = params[param::SIGNATURE].clone();
        prop_assume!(flip_at < sig.len());
        let mut bytes = sig.into_bytes();
        bytes[flip_at] = if bytes[flip_at] == b'f' { b'0' } else { b'f' };
        params.insert(param::SIGNATURE.to_string(), String::from_utf8(bytes).unwrap());

        prop_assert!(!verifier().verify(&params));
    }

    /// Dropping or rewriting any signed parameter must fail verification.
    #[test]
    fn parameter_tampering_is_rejected(value in "[a-z0-9]{1,16}") {
        let mut params = HashMap::from([
            (param::TXN_REF.to_string(), "BOOK-00C0FFEE".to_string()),
            (param::AMOUNT.to_string(), "150000000".to_string()),
        ]);
        signed(&mut params);

        let mut tampered = params.clone();
        tampered.insert(param::AMOUNT.to_string(), format!("9{value}"));
        prop_assert!(!verifier().verify(&tampered));
    }
}
