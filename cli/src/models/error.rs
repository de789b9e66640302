//! Error types for the steamrs client.

use steamrs_core::guard::GuardError;
use thiserror::Error;

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the client.
///
/// Provider-reported failure shapes each get their own variant so callers can
/// distinguish "not logged in yet" from "login attempted and rejected" from
/// "a confirmation exists but none matches" from "no confirmations at all"
/// (the last is a success-path outcome, not an error). Transport failures
/// pass through as [`Error::Transport`] without re-wrapping.
#[derive(Debug, Error)]
pub enum Error {
    /// Guard secret loading or derivation failed.
    #[error(transparent)]
    Guard(#[from] GuardError),

    /// The RSA key endpoint never returned usable key parameters.
    #[error("could not obtain RSA key parameters after {0} attempts")]
    KeyFetchExhausted(u32),

    /// The login endpoint demanded a captcha; this client cannot solve one.
    #[error("captcha required by the login endpoint")]
    CaptchaRequired,

    /// The login endpoint rejected the credentials. Carries the raw response
    /// body for diagnostics.
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    /// The login success response carried no transfer parameters or URLs;
    /// this signals a provider-side protocol change and is not retryable.
    #[error("login response carried no transfer setup")]
    RedirectSetupMissing,

    /// Logout did not invalidate the session on the provider side.
    #[error("logout did not invalidate the session")]
    LogoutFailed,

    /// The confirmation endpoint rejected the signing key; the guard bundle
    /// is misconfigured, this is not transient.
    #[error("confirmation endpoint rejected the signing key")]
    InvalidGuardSecret,

    /// Confirmations exist, but none resolved to the requested identifier.
    #[error("no pending confirmation matches the requested id")]
    ConfirmationNotFound,

    /// A confirmation page could not be parsed. Not retried automatically;
    /// re-invoking the resolve call fetches a fresh list.
    #[error("could not parse confirmation page: {0}")]
    ConfirmationPageParse(String),

    /// An authenticated operation was attempted before a successful login.
    #[error("not authenticated: call login first")]
    NotAuthenticated,

    /// The market price endpoint returned 429.
    #[error("too many requests: price queries are limited to 20 per minute")]
    RateLimited,

    /// The Web API rejected the configured key.
    #[error("invalid Web API key")]
    InvalidApiKey,

    /// The account is under a seven-day trade hold after a new-device login.
    #[error("account logged in on a new device and cannot trade for 7 days")]
    SevenDaysHold,

    /// The provider returned an unexpected shape or status.
    #[error("api error: {0}")]
    Api(String),

    /// Local RSA encryption failed.
    #[error("rsa encryption failed: {0}")]
    Rsa(#[from] rsa::Error),

    /// Transport-level failure (timeout, connection error), passed through.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    /// A response body was not the expected JSON.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// The config file did not parse.
    #[error("invalid config file: {0}")]
    Config(String),

    /// Local I/O failure (config or guard file access).
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
