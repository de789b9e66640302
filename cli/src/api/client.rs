//! HTTP plumbing shared by every endpoint: one reqwest client, one cookie
//! jar, the set of origins the client talks to.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, RequestBuilder, Response, Url};

use crate::models::Result;

const USER_AGENT: &str = concat!("steamrs/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The cookie-isolated origins a session spans, plus the Web API host.
///
/// Overridable so tests can point every origin at a local mock server.
#[derive(Debug, Clone)]
pub struct SteamUrls {
    /// `steamcommunity.com` — confirmations, trading, market pages.
    pub community: Url,
    /// `store.steampowered.com` — login and logout endpoints.
    pub store: Url,
    /// `api.steampowered.com` — the key-authenticated Web API.
    pub api: Url,
}

impl Default for SteamUrls {
    fn default() -> Self {
        Self {
            community: Url::parse("https://steamcommunity.com").expect("static URL"),
            store: Url::parse("https://store.steampowered.com").expect("static URL"),
            api: Url::parse("https://api.steampowered.com").expect("static URL"),
        }
    }
}

/// A reqwest wrapper owning the shared cookie jar.
///
/// Every endpoint goes through this type so that cookies issued on one origin
/// are visible when the session identifier has to be propagated to the
/// others.
pub struct ApiClient {
    http: Client,
    jar: Arc<Jar>,
    urls: SteamUrls,
}

impl ApiClient {
    /// Client against the production origins.
    pub fn new() -> Result<Self> {
        Self::with_urls(SteamUrls::default())
    }

    /// Client against custom origins (tests, proxies).
    pub fn with_urls(urls: SteamUrls) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        let http = Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { http, jar, urls })
    }

    /// The configured origins.
    pub fn urls(&self) -> &SteamUrls {
        &self.urls
    }

    /// A URL under the community origin.
    pub fn community_url(&self, path: &str) -> Url {
        self.urls.community.join(path).expect("valid path")
    }

    /// A URL under the store origin.
    pub fn store_url(&self, path: &str) -> Url {
        self.urls.store.join(path).expect("valid path")
    }

    /// A URL under the Web API origin.
    pub fn api_url(&self, path: &str) -> Url {
        self.urls.api.join(path).expect("valid path")
    }

    /// Request builder with client defaults applied.
    pub fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http.request(method, url)
    }

    /// GET with optional query parameters and headers.
    pub async fn get(
        &self,
        url: Url,
        query: &[(&str, String)],
        headers: HeaderMap,
    ) -> Result<Response> {
        let mut builder = self.http.get(url).headers(headers);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        Ok(builder.send().await?)
    }

    /// POST a urlencoded form.
    pub async fn post_form<T: serde::Serialize + ?Sized>(
        &self,
        url: Url,
        form: &T,
    ) -> Result<Response> {
        Ok(self.http.post(url).form(form).send().await?)
    }

    /// POST a urlencoded form with extra headers.
    pub async fn post_form_with_headers<T: serde::Serialize + ?Sized>(
        &self,
        url: Url,
        form: &T,
        headers: HeaderMap,
    ) -> Result<Response> {
        Ok(self.http.post(url).headers(headers).form(form).send().await?)
    }

    /// The current session identifier, read from the `sessionid` cookie of
    /// whichever configured origin holds one. `None` means no usable session.
    pub fn session_id(&self) -> Option<String> {
        for url in [&self.urls.store, &self.urls.community] {
            if let Some(value) = self.jar.cookies(url) {
                if let Ok(cookies) = value.to_str() {
                    for pair in cookies.split("; ") {
                        if let Some(session_id) = pair.strip_prefix("sessionid=") {
                            return Some(session_id.to_string());
                        }
                    }
                }
            }
        }
        None
    }

    /// Re-set the session identifier cookie on every configured origin.
    ///
    /// The provider issues the cookie for one origin only; the others are
    /// cookie-isolated and must be seeded explicitly before authenticated
    /// requests go out to them.
    pub fn propagate_session_cookie(&self, session_id: &str) {
        for url in [&self.urls.community, &self.urls.store] {
            self.jar
                .add_cookie_str(&format!("sessionid={session_id}; Path=/"), url);
        }
    }
}

/// Current unix time in seconds.
pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs()
}

/// Current unix time in milliseconds, as the login form's cache-buster.
pub(crate) fn unix_now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_none_before_login() {
        let client = ApiClient::new().unwrap();
        assert!(client.session_id().is_none());
    }

    #[test]
    fn test_propagate_session_cookie_visible_on_all_origins() {
        let client = ApiClient::new().unwrap();
        client.propagate_session_cookie("abc123");
        assert_eq!(client.session_id().as_deref(), Some("abc123"));

        for url in [&client.urls().community, &client.urls().store] {
            let cookies = client.jar.cookies(url).expect("cookie present");
            assert!(cookies.to_str().unwrap().contains("sessionid=abc123"));
        }
    }
}
