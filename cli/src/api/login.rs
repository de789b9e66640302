//! The login protocol flow: RSA key fetch, encrypted credential submission,
//! two-factor retry, transfer redirects, session cookie normalization.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use rsa::{BigUint, Pkcs1v15Encrypt, RsaPublicKey};
use serde_json::Value;

use crate::api::client::{ApiClient, unix_now, unix_now_millis};
use crate::api::models::{LoginResponse, RsaKeyResponse};
use crate::models::{Error, Result};
use steamrs_core::guard;

/// Total attempts against the RSA key endpoint before giving up.
const MAX_KEY_FETCH_ATTEMPTS: u32 = 5;

/// Total credential submissions per login call. The provider asking for a
/// two-factor code more than this many times with fresh codes means the guard
/// secret is wrong, not that another retry will help.
const MAX_SUBMIT_ATTEMPTS: u32 = 3;

/// One login attempt against the provider.
///
/// Borrows the [`ApiClient`] the way the rest of the flows do; the caller
/// (the `SteamClient` facade) holds exclusive access for the duration, so no
/// second login can race the redirect-following step.
pub struct LoginFlow<'a> {
    api: &'a ApiClient,
    username: &'a str,
    password: &'a str,
    shared_secret: &'a str,
}

impl<'a> LoginFlow<'a> {
    /// Prepare a login attempt. No request is made until [`run`](Self::run).
    pub fn new(
        api: &'a ApiClient,
        username: &'a str,
        password: &'a str,
        shared_secret: &'a str,
    ) -> Self {
        Self {
            api,
            username,
            password,
            shared_secret,
        }
    }

    /// Drive the flow to a normalized session.
    ///
    /// # Errors
    /// `CaptchaRequired`, `InvalidCredentials`, `KeyFetchExhausted` and
    /// `RedirectSetupMissing` per the protocol; transport errors pass
    /// through.
    pub async fn run(&self) -> Result<()> {
        let mut one_time_code = String::new();

        for attempt in 1..=MAX_SUBMIT_ATTEMPTS {
            let (response, raw_body) = self.submit_credentials(&one_time_code).await?;

            if response.captcha_needed {
                return Err(Error::CaptchaRequired);
            }
            if response.requires_twofactor {
                if attempt == MAX_SUBMIT_ATTEMPTS {
                    return Err(Error::InvalidCredentials(raw_body));
                }
                log::debug!("login requires a two-factor code, regenerating");
                one_time_code = guard::generate_one_time_code(self.shared_secret, unix_now())?;
                continue;
            }
            if !response.success {
                return Err(Error::InvalidCredentials(raw_body));
            }

            self.perform_redirects(&response).await?;
            self.normalize_session()?;
            return Ok(());
        }
        unreachable!("loop exits via return on every branch")
    }

    /// Encrypt the password under a freshly fetched key and POST the login
    /// form. Returns the parsed response plus the raw body for diagnostics.
    async fn submit_credentials(&self, one_time_code: &str) -> Result<(LoginResponse, String)> {
        let (encrypted_password, rsa_timestamp) = self.fetch_and_encrypt_password().await?;
        let donotcache = unix_now_millis().to_string();
        let form = [
            ("password", encrypted_password.as_str()),
            ("username", self.username),
            ("twofactorcode", one_time_code),
            ("emailauth", ""),
            ("loginfriendlyname", ""),
            ("captchagid", "-1"),
            ("captcha_text", ""),
            ("emailsteamid", ""),
            ("rsatimestamp", rsa_timestamp.as_str()),
            ("remember_login", "false"),
            ("donotcache", donotcache.as_str()),
        ];

        let url = self.api.store_url("/login/dologin/");
        let response = self.api.post_form(url, &form).await?;
        let raw_body = response.text().await?;
        let parsed: LoginResponse = serde_json::from_str(&raw_body)?;
        Ok((parsed, raw_body))
    }

    /// Fetch RSA key parameters and encrypt the password under them.
    ///
    /// The key fetch is retried in a bounded loop when the provider returns
    /// an incomplete shape; the local encryption step is deterministic given
    /// valid key material and is never retried.
    async fn fetch_and_encrypt_password(&self) -> Result<(String, String)> {
        let (key, timestamp) = self.fetch_rsa_params().await?;
        let ciphertext = key.encrypt(
            &mut rand::thread_rng(),
            Pkcs1v15Encrypt,
            self.password.as_bytes(),
        )?;
        Ok((BASE64.encode(ciphertext), timestamp))
    }

    async fn fetch_rsa_params(&self) -> Result<(RsaPublicKey, String)> {
        let url = self.api.store_url("/login/getrsakey/");
        for attempt in 1..=MAX_KEY_FETCH_ATTEMPTS {
            let response = self
                .api
                .post_form(url.clone(), &[("username", self.username)])
                .await?;
            let body = response.text().await?;

            // An error shape (rate limiting, unknown user) is not JSON with
            // these fields; treat it as a miss and try again.
            let key_response: RsaKeyResponse = match serde_json::from_str(&body) {
                Ok(parsed) => parsed,
                Err(e) => {
                    log::debug!("RSA key response unparsable on attempt {attempt}: {e}");
                    continue;
                }
            };
            let (Some(modulus), Some(exponent), Some(timestamp)) = (
                key_response.publickey_mod,
                key_response.publickey_exp,
                key_response.timestamp,
            ) else {
                log::debug!("RSA key response incomplete on attempt {attempt}");
                continue;
            };

            let n = BigUint::parse_bytes(modulus.as_bytes(), 16)
                .ok_or_else(|| Error::Api(format!("RSA modulus is not hex: {modulus}")))?;
            let e = BigUint::parse_bytes(exponent.as_bytes(), 16)
                .ok_or_else(|| Error::Api(format!("RSA exponent is not hex: {exponent}")))?;
            let key = RsaPublicKey::new(n, e)?;
            return Ok((key, timestamp));
        }
        Err(Error::KeyFetchExhausted(MAX_KEY_FETCH_ATTEMPTS))
    }

    /// POST the shared transfer payload to each transfer URL in order. The
    /// responses set per-origin cookies; their bodies are read but not
    /// interpreted.
    async fn perform_redirects(&self, response: &LoginResponse) -> Result<()> {
        let parameters = response
            .transfer_parameters
            .as_ref()
            .ok_or(Error::RedirectSetupMissing)?;
        let urls = response
            .transfer_urls
            .as_ref()
            .ok_or(Error::RedirectSetupMissing)?;
        let form = transfer_form(parameters)?;

        for url in urls {
            log::debug!("following transfer url {url}");
            let target = reqwest::Url::parse(url)
                .map_err(|e| Error::Api(format!("bad transfer url {url}: {e}")))?;
            let response = self.api.post_form(target, &form).await?;
            response.bytes().await?;
        }
        Ok(())
    }

    /// Copy the issued session cookie onto every configured origin.
    fn normalize_session(&self) -> Result<()> {
        let session_id = self
            .api
            .session_id()
            .ok_or_else(|| Error::Api("login completed without a sessionid cookie".to_string()))?;
        self.api.propagate_session_cookie(&session_id);
        Ok(())
    }
}

/// Flatten the transfer parameter object into form fields. Non-string
/// scalars (the payload carries a boolean) are rendered as their JSON text.
fn transfer_form(parameters: &Value) -> Result<Vec<(String, String)>> {
    let object = parameters.as_object().ok_or(Error::RedirectSetupMissing)?;
    Ok(object
        .iter()
        .map(|(key, value)| {
            let rendered = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), rendered)
        })
        .collect())
}
