//! LINE webhook signature verification.
//!
//! LINE signs each delivery with HMAC-SHA256 over the raw request body, keyed
//! by the channel secret, and sends the base64 digest in `X-Line-Signature`.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::WebhookError;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the delivery signature.
pub const SIGNATURE_HEADER: &str = "x-line-signature";

/// Verify a base64 HMAC-SHA256 signature against a request body.
///
/// Uses constant-time comparison to prevent timing attacks.
pub fn verify_signature(
    channel_secret: &[u8],
    body: &[u8],
    signature_b64: &str,
) -> Result<(), WebhookError> {
    let expected = STANDARD
        .decode(signature_b64.trim())
        .map_err(|_| WebhookError::InvalidSignature)?;

    let mut mac = HmacSha256::new_from_slice(channel_secret)
        .map_err(|e| WebhookError::InvalidKey(e.to_string()))?;
    mac.update(body);

    mac.verify_slice(&expected)
        .map_err(|_| WebhookError::InvalidSignature)
}

/// Compute the signature LINE would send for `body`.
pub fn sign(channel_secret: &[u8], body: &[u8]) -> Result<String, WebhookError> {
    let mut mac = HmacSha256::new_from_slice(channel_secret)
        .map_err(|e| WebhookError::InvalidKey(e.to_string()))?;
    mac.update(body);
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}
