/**
 * Broadcast Signature Codec
 *
 * This module produces and verifies the signed header proving a
 * broadcast request originated from a trusted server process holding
 * the shared secret, and rejects replayed requests.
 *
 * # Header Format
 *
 * `t=<unix-seconds>,v1=<hex-hmac-sha256>` - exactly two fields, in
 * this order, comma-separated, no whitespace. The verifier parses this
 * format and nothing else.
 *
 * # Failure Semantics
 *
 * Verification fails closed: a malformed header, a tampered body, or
 * an expired timestamp all produce `false` with no distinguishing
 * detail for the caller (no oracle leakage). Format and freshness are
 * independently fail-closed - an expired timestamp is rejected even
 * when the signature over it is valid.
 */

use std::fmt;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::config::MIN_SECRET_LEN;
use crate::error::RealtimeError;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the broadcast signature
pub const SIGNATURE_HEADER: &str = "x-broadcast-signature";

/// Accepted clock skew between signing and verification, in seconds
///
/// Requests signed outside this window are rejected unconditionally,
/// which also bounds the replay surface.
pub const REPLAY_WINDOW_SECS: i64 = 300;

/// A signature over one outbound broadcast
///
/// Created per call, consumed immediately by the header formatter, and
/// verified once by the receiver; never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastSignature {
    /// Seconds since epoch at signing time
    pub timestamp: i64,
    /// Hex-encoded HMAC-SHA256 over `"{timestamp}.{body}"`
    pub signature: String,
}

/// Render the signature header value
///
/// The format is stable and parsed exactly by [`BroadcastSigner::verify`]:
/// field order `t` then `v1`, comma-separated, no whitespace.
pub fn format_header(timestamp: i64, signature: &str) -> String {
    format!("t={timestamp},v1={signature}")
}

/// Signs and verifies broadcast payloads with the shared secret
#[derive(Clone)]
pub struct BroadcastSigner {
    secret: Vec<u8>,
}

impl fmt::Debug for BroadcastSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BroadcastSigner").finish_non_exhaustive()
    }
}

impl BroadcastSigner {
    /// Create a signer from the shared secret
    ///
    /// # Errors
    ///
    /// A secret shorter than [`MIN_SECRET_LEN`] characters is a fatal
    /// configuration error - the gateway must never sign with an empty
    /// or weak key.
    pub fn new(secret: &str) -> Result<Self, RealtimeError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(RealtimeError::config(format!(
                "Broadcast secret must be at least {MIN_SECRET_LEN} characters"
            )));
        }
        Ok(Self {
            secret: secret.as_bytes().to_vec(),
        })
    }

    /// Sign a broadcast body at the current time
    pub fn sign(&self, body: &str) -> BroadcastSignature {
        self.sign_at(body, unix_now())
    }

    /// Verify a signature header against a body at the current time
    ///
    /// Returns `false` for malformed headers, expired timestamps, and
    /// signature mismatches alike; the caller learns nothing about
    /// which check failed.
    pub fn verify(&self, header: &str, body: &str) -> bool {
        self.verify_at(header, body, unix_now())
    }

    fn sign_at(&self, body: &str, timestamp: i64) -> BroadcastSignature {
        BroadcastSignature {
            timestamp,
            signature: hex::encode(self.digest(body, timestamp)),
        }
    }

    fn verify_at(&self, header: &str, body: &str, now: i64) -> bool {
        let Some((timestamp, provided_hex)) = parse_header(header) else {
            return false;
        };

        // Freshness is checked independently of signature validity: an
        // expired timestamp loses even with a correct signature.
        if (now - timestamp).abs() > REPLAY_WINDOW_SECS {
            return false;
        }

        let Ok(provided) = hex::decode(provided_hex) else {
            return false;
        };

        let expected = self.digest(body, timestamp);
        // Timing-safe comparison; naive equality would leak a prefix
        // oracle to the peer.
        bool::from(expected.ct_eq(provided.as_slice()))
    }

    fn digest(&self, body: &str, timestamp: i64) -> Vec<u8> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC accepts keys of any length");
        mac.update(format!("{timestamp}.{body}").as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

/// Parse `t=<seconds>,v1=<hex>` into its fields
///
/// Anything that deviates from the exact two-field format - missing
/// prefixes, extra fields, wrong delimiter, non-numeric timestamp,
/// empty signature - yields `None`.
fn parse_header(header: &str) -> Option<(i64, &str)> {
    let mut fields = header.split(',');
    let timestamp = fields.next()?.strip_prefix("t=")?;
    let signature = fields.next()?.strip_prefix("v1=")?;
    if fields.next().is_some() {
        return None;
    }
    let timestamp: i64 = timestamp.parse().ok()?;
    if signature.is_empty() {
        return None;
    }
    Some((timestamp, signature))
}

fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn signer() -> BroadcastSigner {
        BroadcastSigner::new(SECRET).unwrap()
    }

    #[test]
    fn test_short_secret_rejected_at_construction() {
        assert!(BroadcastSigner::new("").is_err());
        assert!(BroadcastSigner::new("0123456789abcdef0123456789abcde").is_err());
        assert!(BroadcastSigner::new(SECRET).is_ok());
    }

    #[test]
    fn test_header_format_is_stable() {
        let sig = BroadcastSignature {
            timestamp: 1700000000,
            signature: "abc123".to_string(),
        };
        assert_eq!(
            format_header(sig.timestamp, &sig.signature),
            "t=1700000000,v1=abc123"
        );
    }

    #[test]
    fn test_round_trip() {
        let signer = signer();
        let body = r#"{"channelId":"page:1","event":"document:update","payload":{}}"#;
        let sig = signer.sign(body);
        let header = format_header(sig.timestamp, &sig.signature);
        assert!(signer.verify(&header, body));
    }

    #[test]
    fn test_tampered_body_rejected() {
        let signer = signer();
        let body = r#"{"channelId":"page:1","event":"page:delete","payload":{}}"#;
        let sig = signer.sign(body);
        let header = format_header(sig.timestamp, &sig.signature);

        let tampered = body.replace("page:1", "page:2");
        assert!(!signer.verify(&header, &tampered));
    }

    #[test]
    fn test_any_single_byte_tamper_rejected() {
        let signer = signer();
        let body = "payload-bytes";
        let sig = signer.sign(body);
        let header = format_header(sig.timestamp, &sig.signature);

        for i in 0..body.len() {
            let mut bytes = body.as_bytes().to_vec();
            bytes[i] ^= 0x01;
            let mutated = String::from_utf8(bytes).unwrap();
            assert!(!signer.verify(&header, &mutated), "byte {i} accepted");
        }
    }

    #[test]
    fn test_replay_rejected_past_and_future() {
        let signer = signer();
        let body = "body";
        let now = unix_now();

        for skew in [301, -301, 10_000] {
            let sig = signer.sign_at(body, now - skew);
            let header = format_header(sig.timestamp, &sig.signature);
            // Correct signature for its timestamp, but outside the window.
            assert!(!signer.verify_at(&header, body, now), "skew {skew} accepted");
        }
    }

    #[test]
    fn test_boundary_of_replay_window_accepted() {
        let signer = signer();
        let body = "body";
        let now = unix_now();

        let sig = signer.sign_at(body, now - REPLAY_WINDOW_SECS);
        let header = format_header(sig.timestamp, &sig.signature);
        assert!(signer.verify_at(&header, body, now));
    }

    #[test]
    fn test_malformed_headers_rejected_without_panic() {
        let signer = signer();
        let body = "body";
        let sig = signer.sign(body);

        let malformed = [
            String::new(),
            "garbage".to_string(),
            format!("v1={},t={}", sig.signature, sig.timestamp), // wrong order
            format!("t={}", sig.timestamp),                      // missing v1
            format!("v1={}", sig.signature),                     // missing t
            format!("t={};v1={}", sig.timestamp, sig.signature), // wrong delimiter
            format!("t={},v1={},extra=1", sig.timestamp, sig.signature),
            format!("t=abc,v1={}", sig.signature),               // non-numeric t
            format!("t={},v1=", sig.timestamp),                  // empty signature
            format!("t={}, v1={}", sig.timestamp, sig.signature), // whitespace
            format!("t={},v1=not-hex!", sig.timestamp),
        ];
        for header in malformed {
            assert!(!signer.verify(&header, body), "accepted: {header:?}");
        }
    }

    #[test]
    fn test_signature_from_other_secret_rejected() {
        let signer_a = signer();
        let signer_b =
            BroadcastSigner::new("ffffffffffffffffffffffffffffffff").unwrap();
        let body = "body";
        let sig = signer_b.sign(body);
        let header = format_header(sig.timestamp, &sig.signature);
        assert!(!signer_a.verify(&header, body));
    }

    #[test]
    fn test_signature_is_hex_sha256_length() {
        let sig = signer().sign("body");
        assert_eq!(sig.signature.len(), 64);
        assert!(sig.signature.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
