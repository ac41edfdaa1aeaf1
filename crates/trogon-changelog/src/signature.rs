use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header GitHub uses to carry the body signature.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Verifies a GitHub webhook signature using constant-time comparison.
///
/// GitHub sends `X-Hub-Signature-256: sha256=<hex>`. This validates the
/// HMAC-SHA256 of the raw request body against that header value.
///
/// Fail-closed: a missing header, an unset or empty secret, a missing
/// `sha256=` prefix or undecodable hex all yield `false`.
pub fn verify(signature_header: Option<&str>, body: &[u8], secret: Option<&str>) -> bool {
    let (Some(header), Some(secret)) = (signature_header, secret) else {
        return false;
    };
    if secret.is_empty() {
        return false;
    }

    let Some(hex_sig) = header.trim().strip_prefix("sha256=") else {
        return false;
    };

    let Ok(expected) = hex::decode(hex_sig) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };

    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}
