//! HMAC-SHA256 verification of webhook bodies.
//!
//! The digest is computed over the exact request bytes, never over a
//! re-serialized form. Comparison goes through `Mac::verify_slice`, which is
//! constant time.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the voice processor's signature.
pub const VOICE_SIGNATURE_HEADER: &str = "x-voice-signature";

const SIGNATURE_PREFIX: &str = "sha256=";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureCheck {
    Valid,
    Missing,
    Malformed,
    Mismatch,
}

impl SignatureCheck {
    #[must_use]
    pub const fn is_valid(self) -> bool {
        matches!(self, Self::Valid)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::Missing => "missing signature",
            Self::Malformed => "malformed signature",
            Self::Mismatch => "signature mismatch",
        }
    }
}

#[derive(Clone)]
pub struct SignatureVerifier {
    keyed: HmacSha256,
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier").field("secret", &"[REDACTED]").finish()
    }
}

impl SignatureVerifier {
    /// # Errors
    /// Returns `InvalidLength` if the MAC rejects the key.
    pub fn new(secret: &[u8]) -> Result<Self, hmac::digest::InvalidLength> {
        Ok(Self { keyed: HmacSha256::new_from_slice(secret)? })
    }

    fn mac(&self) -> HmacSha256 {
        self.keyed.clone()
    }

    /// Hex signature of `body`, in the same format the provider sends.
    #[must_use]
    pub fn sign(&self, body: &[u8]) -> String {
        let mut mac = self.mac();
        mac.update(body);
        format!("{SIGNATURE_PREFIX}{}", hex::encode(mac.finalize().into_bytes()))
    }

    /// Check `header` (hex, optionally `sha256=`-prefixed) against `body`.
    #[must_use]
    pub fn verify(&self, body: &[u8], header: Option<&str>) -> SignatureCheck {
        let Some(header) = header.map(str::trim).filter(|h| !h.is_empty()) else {
            return SignatureCheck::Missing;
        };
        let encoded = header.strip_prefix(SIGNATURE_PREFIX).unwrap_or(header);
        let Ok(expected) = hex::decode(encoded) else {
            return SignatureCheck::Malformed;
        };
        let mut mac = self.mac();
        mac.update(body);
        match mac.verify_slice(&expected) {
            Ok(()) => SignatureCheck::Valid,
            Err(_) => SignatureCheck::Mismatch,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "test code")]

    use super::*;

    fn verifier(secret: &str) -> SignatureVerifier {
        SignatureVerifier::new(secret.as_bytes()).unwrap()
    }

    const BODY: &[u8] = br#"{"type":"call_started","call_id":"c-1"}"#;

    #[test]
    fn accepts_own_signature_with_and_without_prefix() {
        let v = verifier("s3cret");
        let signed = v.sign(BODY);
        assert_eq!(v.verify(BODY, Some(&signed)), SignatureCheck::Valid);
        let bare = signed.trim_start_matches(SIGNATURE_PREFIX);
        assert_eq!(v.verify(BODY, Some(bare)), SignatureCheck::Valid);
    }

    #[test]
    fn known_vector() {
        // RFC 4231 test case 2.
        let v = verifier("Jefe");
        assert_eq!(
            v.sign(b"what do ya want for nothing?"),
            "sha256=5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn rejects_tampering_and_garbage() {
        let v = verifier("s3cret");
        let signed = v.sign(BODY);
        let reserialized = br#"{"call_id":"c-1","type":"call_started"}"#;

        assert_eq!(v.verify(reserialized, Some(&signed)), SignatureCheck::Mismatch);
        assert_eq!(v.verify(BODY, None), SignatureCheck::Missing);
        assert_eq!(v.verify(BODY, Some("  ")), SignatureCheck::Missing);
        assert_eq!(v.verify(BODY, Some("sha256=zz")), SignatureCheck::Malformed);
        assert_eq!(
            verifier("other").verify(BODY, Some(&signed)),
            SignatureCheck::Mismatch
        );
    }

    #[test]
    fn debug_hides_secret() {
        let debug = format!("{:?}", verifier("s3cret"));
        assert!(!debug.contains("s3cret"));
    }
}
