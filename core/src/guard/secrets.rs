//! The per-account guard secrets bundle.

use std::fmt;
use std::path::Path;

use serde::Deserialize;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::{GuardError, Result, decode_secret};

/// A user's SteamGuard secrets: the account's steam id plus the two
/// independent base32 keys.
///
/// Immutable after load. This crate never persists the bundle; storage is the
/// caller's concern.
#[derive(Clone, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct GuardSecrets {
    /// The 64-bit account identifier, as a decimal string.
    #[serde(rename = "steamid", alias = "steam_id")]
    pub steam_id: String,
    /// Base32 key for the login one-time code.
    pub shared_secret: String,
    /// Base32 key for confirmation request signing. Independent of
    /// `shared_secret`.
    pub identity_secret: String,
}

impl GuardSecrets {
    /// Load secrets from an opaque descriptor: a path to a JSON guard file,
    /// or the JSON document itself inline.
    ///
    /// # Errors
    /// Returns [`GuardError::MalformedGuardFile`] if the descriptor cannot be
    /// read, a field is missing, or a secret is not valid base32.
    pub fn load(descriptor: &str) -> Result<Self> {
        if Path::new(descriptor).is_file() {
            let contents = std::fs::read_to_string(descriptor)
                .map_err(|e| GuardError::MalformedGuardFile(e.to_string()))?;
            Self::from_json(&contents)
        } else {
            Self::from_json(descriptor)
        }
    }

    /// Parse secrets from a JSON document.
    ///
    /// # Errors
    /// Returns [`GuardError::MalformedGuardFile`] if a field is missing or a
    /// secret is not valid base32.
    pub fn from_json(json: &str) -> Result<Self> {
        let secrets: Self =
            serde_json::from_str(json).map_err(|e| GuardError::MalformedGuardFile(e.to_string()))?;
        secrets.validate()?;
        Ok(secrets)
    }

    fn validate(&self) -> Result<()> {
        if self.steam_id.is_empty() || !self.steam_id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(GuardError::MalformedGuardFile(
                "steamid must be a decimal account id".to_string(),
            ));
        }
        for (name, secret) in [
            ("shared_secret", &self.shared_secret),
            ("identity_secret", &self.identity_secret),
        ] {
            decode_secret(secret)
                .map_err(|e| GuardError::MalformedGuardFile(format!("{name}: {e}")))?;
        }
        Ok(())
    }
}

// Secrets stay out of logs; only the public account id is shown.
impl fmt::Debug for GuardSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardSecrets")
            .field("steam_id", &self.steam_id)
            .field("shared_secret", &"<redacted>")
            .field("identity_secret", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GUARD_JSON: &str = r#"{
        "steamid": "76561197960287930",
        "shared_secret": "ONUGC4TFMQWXGZLDOJSXILLBMJRWIZLG",
        "identity_secret": "NFSGK3TUNF2HSLLTMVRXEZLUFUYDCMRT"
    }"#;

    #[test]
    fn test_from_json_inline() {
        let secrets = GuardSecrets::from_json(GUARD_JSON).unwrap();
        assert_eq!(secrets.steam_id, "76561197960287930");
        assert_eq!(secrets.shared_secret, "ONUGC4TFMQWXGZLDOJSXILLBMJRWIZLG");
    }

    #[test]
    fn test_load_accepts_inline_json() {
        let secrets = GuardSecrets::load(GUARD_JSON).unwrap();
        assert_eq!(secrets.steam_id, "76561197960287930");
    }

    #[test]
    fn test_load_from_file() {
        let dir = std::env::temp_dir();
        let path = dir.join("steamrs-guard-test.json");
        std::fs::write(&path, GUARD_JSON).unwrap();
        let secrets = GuardSecrets::load(path.to_str().unwrap()).unwrap();
        assert_eq!(secrets.steam_id, "76561197960287930");
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_missing_field_is_malformed() {
        let result = GuardSecrets::from_json(r#"{"steamid": "1", "shared_secret": "MFRGG"}"#);
        assert!(matches!(result, Err(GuardError::MalformedGuardFile(_))));
    }

    #[test]
    fn test_invalid_base32_is_malformed() {
        let result = GuardSecrets::from_json(
            r#"{"steamid": "1", "shared_secret": "!!!", "identity_secret": "MFRGG"}"#,
        );
        assert!(matches!(result, Err(GuardError::MalformedGuardFile(_))));
    }

    #[test]
    fn test_non_numeric_steam_id_is_malformed() {
        let result = GuardSecrets::from_json(
            r#"{"steamid": "abc", "shared_secret": "MFRGG", "identity_secret": "MFRGG"}"#,
        );
        assert!(matches!(result, Err(GuardError::MalformedGuardFile(_))));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let secrets = GuardSecrets::from_json(GUARD_JSON).unwrap();
        let rendered = format!("{secrets:?}");
        assert!(rendered.contains("76561197960287930"));
        assert!(!rendered.contains("ONUGC4TF"));
    }
}
