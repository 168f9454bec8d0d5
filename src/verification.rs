use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Prefix GitHub puts in front of the hex digest in `X-Hub-Signature-256`.
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Verifies GitHub-style HMAC-SHA256 signatures against one shared secret.
///
/// The secret is fixed at construction; verification itself does no I/O and
/// touches no shared mutable state.
#[derive(Clone)]
pub struct Verifier {
    secret: Vec<u8>,
}

impl std::fmt::Debug for Verifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Verifier").field("secret", &"<redacted>").finish()
    }
}

impl Verifier {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    fn mac(&self) -> HmacSha256 {
        // HMAC-SHA256 accepts keys of any length, including empty ones.
        HmacSha256::new_from_slice(&self.secret).expect("HMAC key of any length")
    }

    /// Verify a signature header value over the raw request body.
    ///
    /// Accepts both `"sha256=<hex>"` and a bare `"<hex>"`. The supplied digest
    /// must equal the lowercase hex rendering of the MAC; the comparison runs
    /// in constant time. An absent, empty, malformed or mismatched signature
    /// all yield `false`.
    pub fn verify(&self, payload: &[u8], signature_header: Option<&str>) -> bool {
        let header = match signature_header {
            Some(h) if !h.is_empty() => h,
            _ => return false,
        };

        let supplied = header.strip_prefix(SIGNATURE_PREFIX).unwrap_or(header);
        let expected = self.digest_hex(payload);

        expected.as_bytes().ct_eq(supplied.as_bytes()).into()
    }

    /// Lowercase hex HMAC-SHA256 of `payload`, without prefix.
    pub fn digest_hex(&self, payload: &[u8]) -> String {
        let mut mac = self.mac();
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    /// Wire-exact signature header value for `payload`.
    pub fn sign(&self, payload: &[u8]) -> String {
        format!("{SIGNATURE_PREFIX}{}", self.digest_hex(payload))
    }
}
