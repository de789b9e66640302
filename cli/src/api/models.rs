//! Wire shapes consumed from the login and confirmation endpoints.

use serde::Deserialize;
use serde_json::Value;

/// Response of the RSA key endpoint.
///
/// All fields are optional: on rate limiting or an unknown user the provider
/// returns an error shape with the fields absent, which the login flow treats
/// as a retryable miss.
#[derive(Debug, Deserialize)]
pub struct RsaKeyResponse {
    /// RSA modulus, hex-encoded.
    pub publickey_mod: Option<String>,
    /// RSA public exponent, hex-encoded.
    pub publickey_exp: Option<String>,
    /// Key issue timestamp, echoed back on credential submission.
    pub timestamp: Option<String>,
}

/// Response of the credential submission endpoint.
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    /// True once the provider accepted the credentials.
    #[serde(default)]
    pub success: bool,
    /// The provider demands a captcha; terminal for this client.
    #[serde(default)]
    pub captcha_needed: bool,
    /// The provider demands a two-factor code.
    #[serde(default)]
    pub requires_twofactor: bool,
    /// Human-readable failure detail, when present.
    #[serde(default)]
    pub message: Option<String>,
    /// Redirect targets used to finalize the login on each origin.
    #[serde(default)]
    pub transfer_urls: Option<Vec<String>>,
    /// Shared payload to POST to every transfer URL.
    #[serde(default)]
    pub transfer_parameters: Option<Value>,
}

/// Response of the confirmation detail endpoint.
#[derive(Debug, Deserialize)]
pub struct ConfirmationDetailsResponse {
    /// Whether the detail view was produced.
    #[serde(default)]
    pub success: bool,
    /// The rendered detail markup the business identifier is embedded in.
    pub html: Option<String>,
}

/// Response of the confirmation ajax-op endpoint.
#[derive(Debug, Deserialize)]
pub struct AjaxOpResponse {
    /// Whether the operation was applied.
    #[serde(default)]
    pub success: bool,
}
