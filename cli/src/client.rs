//! The client facade: owns the HTTP plumbing, the guard secrets and the
//! session state, and exposes the authenticated operations.

use reqwest::Method;

use crate::api::client::{ApiClient, SteamUrls};
use crate::api::confirmation::{
    ConfirmationAction, ConfirmationFlow, ConfirmationResult, ConfirmationTarget,
};
use crate::api::login::LoginFlow;
use crate::market::Market;
use crate::models::{Error, Result};
use steamrs_core::guard::GuardSecrets;

/// An authenticated Steam web client.
///
/// Login and logout take `&mut self`: exclusive access over the session
/// mutation is enforced by the borrow checker, so a second login cannot race
/// the redirect-following step on the same handle.
pub struct SteamClient {
    api: ApiClient,
    api_key: Option<String>,
    guard: Option<GuardSecrets>,
    username: Option<String>,
    authenticated: bool,
}

impl SteamClient {
    /// Client against the production origins. The Web API key is optional;
    /// only the `api_call`-backed operations need it.
    pub fn new(api_key: Option<String>) -> Result<Self> {
        Self::with_urls(SteamUrls::default(), api_key)
    }

    /// Client against custom origins (tests, proxies).
    pub fn with_urls(urls: SteamUrls, api_key: Option<String>) -> Result<Self> {
        Ok(Self {
            api: ApiClient::with_urls(urls)?,
            api_key,
            guard: None,
            username: None,
            authenticated: false,
        })
    }

    pub(crate) fn api(&self) -> &ApiClient {
        &self.api
    }

    pub(crate) fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| Error::Api("no Web API key configured".to_string()))
    }

    pub(crate) fn guard(&self) -> Result<&GuardSecrets> {
        self.guard.as_ref().ok_or(Error::NotAuthenticated)
    }

    /// Fail fast when no usable session exists. Called at the top of every
    /// authenticated operation so the provider is never handed a request it
    /// would silently reject.
    pub(crate) fn ensure_authenticated(&self) -> Result<()> {
        if !self.authenticated || self.api.session_id().is_none() {
            return Err(Error::NotAuthenticated);
        }
        Ok(())
    }

    /// Run the login protocol and normalize the session across origins.
    ///
    /// `guard_descriptor` is a path to a guard file or the JSON document
    /// inline; see [`GuardSecrets::load`].
    pub async fn login(
        &mut self,
        username: &str,
        password: &str,
        guard_descriptor: &str,
    ) -> Result<()> {
        let guard = GuardSecrets::load(guard_descriptor)?;
        LoginFlow::new(&self.api, username, password, &guard.shared_secret)
            .run()
            .await?;
        self.guard = Some(guard);
        self.username = Some(username.to_string());
        self.authenticated = true;
        log::info!("logged in as {username}");
        Ok(())
    }

    /// Invalidate the session on the provider side, then verify it is gone.
    ///
    /// # Errors
    /// [`Error::LogoutFailed`] if the provider still serves an authenticated
    /// page afterwards; local state is left marked authenticated in that
    /// case rather than silently cleared.
    pub async fn logout(&mut self) -> Result<()> {
        self.ensure_authenticated()?;
        let session_id = self.session_id_required()?;
        let url = self.api.store_url("/logout/");
        let response = self
            .api
            .post_form(url, &[("sessionid", session_id.as_str())])
            .await?;
        response.bytes().await?;

        if self.is_session_alive().await? {
            return Err(Error::LogoutFailed);
        }
        self.authenticated = false;
        self.guard = None;
        Ok(())
    }

    /// Whether the provider still recognizes the session: the community page
    /// shows the username only while logged in.
    pub async fn is_session_alive(&self) -> Result<bool> {
        let username = self.username.as_deref().ok_or(Error::NotAuthenticated)?;
        let url = self.api.urls().community.clone();
        let response = self.api.request(Method::GET, url).send().await?;
        let page = response.text().await?;
        Ok(page.to_lowercase().contains(&username.to_lowercase()))
    }

    /// The current session identifier, or `None` when no session exists.
    ///
    /// Downstream features submit this value as a form parameter, not just
    /// as a cookie.
    pub fn session_id(&self) -> Option<String> {
        self.api.session_id()
    }

    pub(crate) fn session_id_required(&self) -> Result<String> {
        self.api.session_id().ok_or(Error::NotAuthenticated)
    }

    /// Call the key-authenticated Web API.
    ///
    /// # Errors
    /// [`Error::InvalidApiKey`] when the API rejects the configured key.
    pub async fn api_call(
        &self,
        method: Method,
        interface: &str,
        api_method: &str,
        version: &str,
        params: &[(&str, String)],
    ) -> Result<String> {
        let url = self
            .api
            .api_url(&format!("/{interface}/{api_method}/{version}"));
        let response = if method == Method::POST {
            self.api.post_form(url, params).await?
        } else {
            self.api
                .get(url, params, reqwest::header::HeaderMap::new())
                .await?
        };
        let body = response.text().await?;
        if is_invalid_api_key(&body) {
            return Err(Error::InvalidApiKey);
        }
        Ok(body)
    }

    /// Approve the pending confirmation for a trade offer.
    pub async fn confirm_trade_offer(&self, trade_offer_id: &str) -> Result<ConfirmationResult> {
        self.respond_to_confirmation(
            ConfirmationTarget::TradeOffer,
            trade_offer_id,
            ConfirmationAction::Allow,
        )
        .await
    }

    /// Approve the pending confirmation for a market sell listing.
    pub async fn confirm_sell_listing(&self, asset_id: &str) -> Result<ConfirmationResult> {
        self.respond_to_confirmation(
            ConfirmationTarget::SellListing,
            asset_id,
            ConfirmationAction::Allow,
        )
        .await
    }

    /// Resolve the pending confirmation matching `target_id` and apply
    /// `action` to it.
    pub async fn respond_to_confirmation(
        &self,
        target: ConfirmationTarget,
        target_id: &str,
        action: ConfirmationAction,
    ) -> Result<ConfirmationResult> {
        self.ensure_authenticated()?;
        let guard = self.guard()?;
        ConfirmationFlow::new(&self.api, &guard.identity_secret, &guard.steam_id)
            .resolve_and_apply(target, target_id, action)
            .await
    }

    /// Market operations bound to this client's session.
    pub fn market(&self) -> Market<'_> {
        Market::new(self)
    }
}

fn is_invalid_api_key(body: &str) -> bool {
    body.contains(
        "Access is denied. Retrying will not help. Please verify your <pre>key=</pre> parameter",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operations_fail_fast_without_login() {
        let client = SteamClient::new(None).unwrap();
        assert!(matches!(
            client.ensure_authenticated(),
            Err(Error::NotAuthenticated)
        ));
        assert!(client.session_id().is_none());
        assert!(matches!(client.guard(), Err(Error::NotAuthenticated)));
    }

    #[test]
    fn test_invalid_api_key_marker() {
        assert!(is_invalid_api_key(
            "<html>Access is denied. Retrying will not help. \
             Please verify your <pre>key=</pre> parameter.</html>"
        ));
        assert!(!is_invalid_api_key("{\"response\":{}}"));
    }
}
