//! Callback signature verification.
//!
//! The gateway signs each successful payment with
//! `HMAC-SHA256(secret, "{gateway_order_id}|{gateway_payment_id}")`, sent as
//! a lowercase hex digest. We recompute the MAC and compare in constant time.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn mac_for(secret: &[u8], gateway_order_id: &str, gateway_payment_id: &str) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC key size is always valid");
    mac.update(gateway_order_id.as_bytes());
    mac.update(b"|");
    mac.update(gateway_payment_id.as_bytes());
    mac
}

/// Compute the hex signature the gateway would send for this payment.
pub fn payment_signature(secret: &[u8], gateway_order_id: &str, gateway_payment_id: &str) -> String {
    let digest = mac_for(secret, gateway_order_id, gateway_payment_id)
        .finalize()
        .into_bytes();
    hex::encode(digest)
}

/// Verify a callback signature.
///
/// Returns false for a wrong MAC, malformed hex, or wrong digest length; the
/// comparison itself runs in constant time via `Mac::verify_slice`.
pub fn verify_payment_signature(
    secret: &[u8],
    gateway_order_id: &str,
    gateway_payment_id: &str,
    provided_hex: &str,
) -> bool {
    let Ok(provided) = hex::decode(provided_hex) else {
        return false;
    };
    mac_for(secret, gateway_order_id, gateway_payment_id)
        .verify_slice(&provided)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-webhook-secret";

    #[test]
    fn signature_round_trips() {
        let sig = payment_signature(SECRET, "order_abc", "pay_xyz");
        assert!(verify_payment_signature(SECRET, "order_abc", "pay_xyz", &sig));
    }

    #[test]
    fn tampered_payment_id_fails() {
        let sig = payment_signature(SECRET, "order_abc", "pay_xyz");
        assert!(!verify_payment_signature(
            SECRET,
            "order_abc",
            "pay_other",
            &sig
        ));
    }

    #[test]
    fn wrong_secret_fails() {
        let sig = payment_signature(SECRET, "order_abc", "pay_xyz");
        assert!(!verify_payment_signature(
            b"other-secret",
            "order_abc",
            "pay_xyz",
            &sig
        ));
    }

    #[test]
    fn malformed_hex_fails_closed() {
        assert!(!verify_payment_signature(
            SECRET,
            "order_abc",
            "pay_xyz",
            "not hex at all"
        ));
        assert!(!verify_payment_signature(SECRET, "order_abc", "pay_xyz", ""));
        // Valid hex, wrong length.
        assert!(!verify_payment_signature(
            SECRET,
            "order_abc",
            "pay_xyz",
            "deadbeef"
        ));
    }
}
