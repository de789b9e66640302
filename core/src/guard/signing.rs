//! Confirmation request signing.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use hmac::{Hmac, Mac};
use sha1::{Digest, Sha1};

use super::{Result, decode_secret};

type HmacSha1 = Hmac<Sha1>;

/// Sign a confirmation-protocol request.
///
/// HMAC-SHA1 keyed by the identity secret over the full 8-byte big-endian
/// timestamp (not divided into windows) concatenated with the UTF-8 tag
/// bytes. The raw 20-byte digest is base64-encoded without truncation: this
/// is a machine-verified signature, not a human-entered code.
///
/// Signatures are single-use within the provider's time window; generate a
/// fresh one per request rather than reusing an earlier value.
///
/// # Arguments
/// * `identity_secret` - Base32 identity secret from the guard bundle.
/// * `tag` - Endpoint tag, e.g. `"conf"`, `"details<id>"`, `"allow"`.
/// * `timestamp` - Current unix time in seconds.
///
/// # Errors
/// Returns [`GuardError::InvalidSecret`](super::GuardError::InvalidSecret) if
/// the secret is not valid base32.
pub fn generate_confirmation_key(identity_secret: &str, tag: &str, timestamp: u64) -> Result<String> {
    let key = decode_secret(identity_secret)?;

    let mut mac = HmacSha1::new_from_slice(&key).expect("HMAC-SHA1 accepts any key length");
    mac.update(&timestamp.to_be_bytes());
    mac.update(tag.as_bytes());
    let digest = mac.finalize().into_bytes();

    Ok(BASE64.encode(digest))
}

/// Derive the stable device identifier for an account.
///
/// SHA-1 of the steam id, rendered as an `android:`-prefixed hyphenated hex
/// id (8-4-4-4-12 groups). Deterministic for a given account; attached to
/// every confirmation-protocol request as an identity claim.
pub fn generate_device_id(steam_id: &str) -> String {
    let digest = Sha1::digest(steam_id.as_bytes());
    let h = hex::encode(digest);
    format!(
        "android:{}-{}-{}-{}-{}",
        &h[..8],
        &h[8..12],
        &h[12..16],
        &h[16..20],
        &h[20..32]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    // base32("identity-secret-0123")
    const IDENTITY_SECRET: &str = "NFSGK3TUNF2HSLLTMVRXEZLUFUYDCMRT";

    #[test]
    fn test_confirmation_key_known_vectors() {
        assert_eq!(
            generate_confirmation_key(IDENTITY_SECRET, "conf", 1_700_000_000).unwrap(),
            "1fkoViMVNOGPuU/nF7OWK1BP9aY="
        );
        assert_eq!(
            generate_confirmation_key(IDENTITY_SECRET, "allow", 1_700_000_000).unwrap(),
            "xrB9+BL2Xt3oXoV8lYWctJC12EQ="
        );
    }

    #[test]
    fn test_confirmation_key_is_base64_of_20_bytes() {
        let key = generate_confirmation_key(IDENTITY_SECRET, "conf", 1_700_000_000).unwrap();
        // 20-byte digest -> 28 base64 chars including one padding byte.
        assert_eq!(key.len(), 28);
        use base64::{Engine, engine::general_purpose::STANDARD};
        assert_eq!(STANDARD.decode(&key).unwrap().len(), 20);
    }

    #[test]
    fn test_any_input_change_changes_the_key() {
        let base = generate_confirmation_key(IDENTITY_SECRET, "conf", 1_700_000_000).unwrap();
        // Unlike the one-time code, the timestamp is not bucketed: one second
        // of drift produces a different signature.
        let other_time =
            generate_confirmation_key(IDENTITY_SECRET, "conf", 1_700_000_001).unwrap();
        let other_tag = generate_confirmation_key(IDENTITY_SECRET, "allow", 1_700_000_000).unwrap();
        assert_ne!(base, other_time);
        assert_ne!(base, other_tag);
        assert_eq!(other_time, "AwlwlYzT0BTDE3seJWvsH4tBah8=");
    }

    #[test]
    fn test_device_id_vector() {
        assert_eq!(
            generate_device_id("76561197960287930"),
            "android:6d3f10d9-6369-a1ae-97a0-94df28b95192"
        );
        // Stable across calls.
        assert_eq!(
            generate_device_id("76561197960287930"),
            generate_device_id("76561197960287930")
        );
    }

    #[test]
    fn test_invalid_secret() {
        assert!(generate_confirmation_key("???", "conf", 0).is_err());
    }
}
