//! Callback signature verification.
//!
//! The gateway signs the canonical query string of every request with a
//! shared secret. The canonical form sorts parameters by ascending key and
//! drops the signature field and empty values, so verification is
//! deterministic regardless of transport-level parameter ordering.

use hmac::{Hmac, Mac};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use sha2::Sha512;
use std::collections::{BTreeMap, HashMap};
use subtle::ConstantTimeEq;

use super::param;

type HmacSha512 = Hmac<Sha512>;

/// HMAC-SHA512 signer/verifier over canonical query strings.
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: Vec<u8>,
}

impl SignatureVerifier {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self { secret: secret.into() }
    }

    /// Canonical query string: ascending key order, percent-encoded values,
    /// signature field and empty values excluded.
    pub fn canonical_query(params: &HashMap<String, String>) -> String {
        let sorted: BTreeMap<&str, &str> = params
            .iter()
            .filter(|(k, v)| k.as_str() != param::SIGNATURE && !v.is_empty())
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        sorted
            .into_iter()
            .map(|(k, v)| format!("{k}={}", utf8_percent_encode(v, NON_ALPHANUMERIC)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Lowercase hex signature over the canonical query string.
    pub fn sign(&self, params: &HashMap<String, String>) -> String {
        let mut mac = HmacSha512::new_from_slice(&self.secret)
            .expect("HMAC accepts keys of any length");
        mac.update(Self::canonical_query(params).as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Authenticate an inbound callback.
    ///
    /// Returns false when the signature field is absent, empty, or does not
    /// match the recomputed hash. Comparison is constant-time and
    /// case-insensitive over the hex digits.
    pub fn verify(&self, params: &HashMap<String, String>) -> bool {
        let received = match params.get(param::SIGNATURE) {
            Some(sig) if !sig.is_empty() => sig.to_ascii_lowercase(),
            _ => return false,
        };
        let expected = self.sign(params);
        received.len() == expected.len()
            && bool::from(received.as_bytes().ct_eq(expected.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_params(verifier: &SignatureVerifier) -> HashMap<String, String> {
        let mut params = HashMap::from([
            (param::TXN_REF.to_string(), "BOOK-1A2B3C4D".to_string()),
            (param::AMOUNT.to_string(), "400000000".to_string()),
            (param::RESPONSE_CODE.to_string(), "00".to_string()),
            (param::ORDER_INFO.to_string(), "rental payment".to_string()),
        ]);
        let sig = verifier.sign(&params);
        params.insert(param::SIGNATURE.to_string(), sig);
        params
    }

    #[test]
    fn accepts_authentic_callbacks() {
        let verifier = SignatureVerifier::new("shared-secret");
        let params = signed_params(&verifier);
        assert!(verifier.verify(&params));
    }

    #[test]
    fn accepts_uppercase_hex() {
        let verifier = SignatureVerifier::new("shared-secret");
        let mut params = signed_params(&verifier);
        let upper = params[param::SIGNATURE].to_ascii_uppercase();
        params.insert(param::SIGNATURE.to_string(), upper);
        assert!(verifier.verify(&params));
    }

    #[test]
    fn rejects_missing_or_empty_signature() {
        let verifier = SignatureVerifier::new("shared-secret");
        let mut params = signed_params(&verifier);
        params.remove(param::SIGNATURE);
        assert!(!verifier.verify(&params));
        params.insert(param::SIGNATURE.to_string(), String::new());
        assert!(!verifier.verify(&params));
    }

    #[test]
    fn any_flipped_signature_character_fails() {
        let verifier = SignatureVerifier::new("shared-secret");
        let params = signed_params(&verifier);
        let sig = params[param::SIGNATURE].clone();

        for i in 0..sig.len() {
            let mut tampered = params.clone();
            let mut bytes = sig.clone().into_bytes();
            bytes[i] = if bytes[i] == b'0' { b'1' } else { b'0' };
            tampered.insert(
                param::SIGNATURE.to_string(),
                String::from_utf8(bytes).unwrap(),
            );
            assert!(!verifier.verify(&tampered), "flip at {i} must fail");
        }
    }

    #[test]
    fn tampered_parameters_fail() {
        let verifier = SignatureVerifier::new("shared-secret");
        let mut params = signed_params(&verifier);
        params.insert(param::AMOUNT.to_string(), "1".to_string());
        assert!(!verifier.verify(&params));
    }

    #[test]
    fn wrong_secret_fails() {
        let signer = SignatureVerifier::new("shared-secret");
        let verifier = SignatureVerifier::new("other-secret");
        assert!(!verifier.verify(&signed_params(&signer)));
    }

    #[test]
    fn canonical_order_is_transport_independent() {
        let verifier = SignatureVerifier::new("shared-secret");
        let a = HashMap::from([
            ("b".to_string(), "2".to_string()),
            ("a".to_string(), "1".to_string()),
        ]);
        let b = HashMap::from([
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "2".to_string()),
        ]);
        assert_eq!(verifier.sign(&a), verifier.sign(&b));
        assert_eq!(SignatureVerifier::canonical_query(&a), "a=1&b=2");
    }
}
