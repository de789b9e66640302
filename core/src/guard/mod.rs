//! SteamGuard secrets and time-based derivations.
//!
//! Two independent keyed derivations live here and must stay independent:
//!
//! - the **login one-time code** ([`generate_one_time_code`]), the 2FA digit
//!   string a user would normally type, derived from the `shared_secret`;
//! - the **confirmation key** ([`generate_confirmation_key`]), a request
//!   signature for the mobile-confirmation endpoints, derived from the
//!   `identity_secret`.
//!
//! They share the "secret + time -> keyed digest" shape but encode different
//! business meanings (human-entered code vs. machine-verified signature), so
//! they are separate named operations rather than one parameterized function.
//!
//! ## Quick Start
//!
//! ```ignore
//! let secrets = GuardSecrets::load("path/to/guard.json")?;
//! let code = guard::generate_one_time_code(&secrets.shared_secret, unix_now)?;
//! let key = guard::generate_confirmation_key(&secrets.identity_secret, "conf", unix_now)?;
//! let device_id = guard::generate_device_id(&secrets.steam_id);
//! ```

mod code;
mod secrets;
mod signing;
mod types;

pub use code::generate_one_time_code;
pub use secrets::GuardSecrets;
pub use signing::{generate_confirmation_key, generate_device_id};
pub use types::{GuardError, Result};

use data_encoding::BASE32_NOPAD;

/// Decode a base32 guard secret to raw key bytes.
///
/// Accepts both padded and unpadded input; anything that is not valid base32
/// after normalization is rejected.
pub(crate) fn decode_secret(secret: &str) -> Result<Vec<u8>> {
    let normalized = secret.trim().trim_end_matches('=').to_ascii_uppercase();
    if normalized.is_empty() {
        return Err(GuardError::InvalidSecret("empty secret".to_string()));
    }
    BASE32_NOPAD
        .decode(normalized.as_bytes())
        .map_err(|e| GuardError::InvalidSecret(e.to_string()))
}
