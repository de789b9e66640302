//! The mobile confirmation flow: list pending confirmations, resolve which
//! entry corresponds to a business action, and apply an allow/cancel op.

use reqwest::header::{HeaderMap, HeaderValue};
use scraper::{Html, Selector};
use serde::Serialize;

use crate::api::client::{ApiClient, unix_now};
use crate::api::models::{AjaxOpResponse, ConfirmationDetailsResponse};
use crate::models::{Error, Result};
use crate::scrape::text_between;
use steamrs_core::guard;

/// Marker the provider renders when the signing key was rejected.
const BAD_GUARD_MESSAGE: &str =
    "Steam Guard Mobile Authenticator is providing incorrect Steam Guard codes.";

/// Platform literal attached to every confirmation-protocol request.
const PLATFORM: &str = "android";

/// What kind of business action a confirmation should be matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationTarget {
    /// A pending trade offer; the identifier is embedded in a DOM element id
    /// on the detail view.
    TradeOffer,
    /// A pending market sell listing; the identifier is embedded in an inline
    /// script payload on the detail view.
    SellListing,
}

/// The operation to apply to a matched confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationAction {
    /// Approve the pending action.
    Allow,
    /// Reject the pending action.
    Cancel,
}

impl ConfirmationAction {
    fn op(self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Cancel => "cancel",
        }
    }
}

/// One pending confirmation entry from the list page.
///
/// Ephemeral: the provider reissues the tamper tokens per page load, so
/// entries are fetched fresh on every discovery call and never cached.
#[derive(Debug, Clone, Serialize)]
pub struct Confirmation {
    /// Numeric id, the suffix of the entry's DOM id.
    pub id: String,
    /// First tamper token (`data-confid`).
    pub data_confid: String,
    /// Second tamper token (`data-key`).
    pub data_key: String,
}

/// Terminal outcome of a resolve call.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum ConfirmationResult {
    /// The matched entry was confirmed (or canceled).
    Applied {
        /// The entry the operation was applied to.
        confirmation: Confirmation,
    },
    /// The pending list was empty. A valid outcome, distinct from
    /// [`Error::ConfirmationNotFound`].
    NoPendingConfirmations,
}

/// The confirmation engine, bound to one account's identity secret.
pub struct ConfirmationFlow<'a> {
    api: &'a ApiClient,
    identity_secret: &'a str,
    steam_id: &'a str,
}

impl<'a> ConfirmationFlow<'a> {
    /// Bind the flow to an account.
    pub fn new(api: &'a ApiClient, identity_secret: &'a str, steam_id: &'a str) -> Self {
        Self {
            api,
            identity_secret,
            steam_id,
        }
    }

    /// Find the pending confirmation whose detail view resolves to
    /// `target_id` and apply `action` to it.
    ///
    /// Entries are scanned in list order and the first match wins. Exhausting
    /// the list yields [`Error::ConfirmationNotFound`]; an empty list is the
    /// [`ConfirmationResult::NoPendingConfirmations`] success outcome and no
    /// detail view is ever fetched for it.
    pub async fn resolve_and_apply(
        &self,
        target: ConfirmationTarget,
        target_id: &str,
        action: ConfirmationAction,
    ) -> Result<ConfirmationResult> {
        let page = self.fetch_confirmations_page().await?;
        let confirmations = parse_confirmations(&page)?;
        if confirmations.is_empty() {
            return Ok(ConfirmationResult::NoPendingConfirmations);
        }

        for confirmation in confirmations {
            let details = self.fetch_details(&confirmation).await?;
            let embedded_id = match target {
                ConfirmationTarget::TradeOffer => extract_trade_offer_id(&details)?,
                ConfirmationTarget::SellListing => extract_sell_listing_id(&details)?,
            };
            if embedded_id == target_id {
                log::debug!(
                    "confirmation {} matches target {target_id}, applying {:?}",
                    confirmation.id,
                    action
                );
                self.send_op(&confirmation, action).await?;
                return Ok(ConfirmationResult::Applied { confirmation });
            }
        }
        Err(Error::ConfirmationNotFound)
    }

    /// Signed query parameters for one request. Generated fresh per request:
    /// signatures are single-use within the provider's time window.
    fn params(&self, tag: &str) -> Result<Vec<(&'static str, String)>> {
        let timestamp = unix_now();
        let key = guard::generate_confirmation_key(self.identity_secret, tag, timestamp)?;
        let device_id = guard::generate_device_id(self.steam_id);
        Ok(vec![
            ("p", device_id),
            ("a", self.steam_id.to_string()),
            ("k", key),
            ("t", timestamp.to_string()),
            ("m", PLATFORM.to_string()),
            ("tag", tag.to_string()),
        ])
    }

    async fn fetch_confirmations_page(&self) -> Result<String> {
        let params = self.params("conf")?;
        let mut headers = HeaderMap::new();
        headers.insert(
            "X-Requested-With",
            HeaderValue::from_static("com.valvesoftware.android.steam.community"),
        );
        let url = self.api.community_url("/mobileconf/conf");
        let response = self.api.get(url, &params, headers).await?;
        let page = response.text().await?;
        if page.contains(BAD_GUARD_MESSAGE) {
            return Err(Error::InvalidGuardSecret);
        }
        Ok(page)
    }

    async fn fetch_details(&self, confirmation: &Confirmation) -> Result<String> {
        let tag = format!("details{}", confirmation.id);
        let params = self.params(&tag)?;
        let url = self
            .api
            .community_url(&format!("/mobileconf/details/{}", confirmation.id));
        let response = self.api.get(url, &params, HeaderMap::new()).await?;
        let details: ConfirmationDetailsResponse = response.json().await?;
        details.html.ok_or_else(|| {
            Error::ConfirmationPageParse("detail response carried no html".to_string())
        })
    }

    async fn send_op(&self, confirmation: &Confirmation, action: ConfirmationAction) -> Result<()> {
        // A fresh signature, generated as close as possible to the send; the
        // list-page signature is never reused here.
        let mut params = self.params(action.op())?;
        params.push(("op", action.op().to_string()));
        params.push(("cid", confirmation.data_confid.clone()));
        params.push(("ck", confirmation.data_key.clone()));

        let mut headers = HeaderMap::new();
        headers.insert("X-Requested-With", HeaderValue::from_static("XMLHttpRequest"));
        let url = self.api.community_url("/mobileconf/ajaxop");
        let response = self.api.get(url, &params, headers).await?;
        let outcome: AjaxOpResponse = response.json().await?;
        if !outcome.success {
            return Err(Error::Api(format!(
                "confirmation op {} rejected for entry {}",
                action.op(),
                confirmation.id
            )));
        }
        Ok(())
    }
}

/// Parse the confirmation list page. An empty list is a valid page carrying
/// the empty marker; a page with neither marker nor list is malformed.
fn parse_confirmations(page: &str) -> Result<Vec<Confirmation>> {
    let document = Html::parse_document(page);
    let empty_marker = Selector::parse("#mobileconf_empty").expect("valid selector");
    if document.select(&empty_marker).next().is_some() {
        return Ok(Vec::new());
    }

    let list = Selector::parse("#mobileconf_list").expect("valid selector");
    if document.select(&list).next().is_none() {
        return Err(Error::ConfirmationPageParse(
            "page carries neither a confirmation list nor the empty marker".to_string(),
        ));
    }

    let entry = Selector::parse("#mobileconf_list .mobileconf_list_entry").expect("valid selector");
    let mut confirmations = Vec::new();
    for element in document.select(&entry) {
        let dom_id = element.value().attr("id").unwrap_or_default();
        let id = dom_id.strip_prefix("conf").unwrap_or_default();
        let data_confid = element.value().attr("data-confid");
        let data_key = element.value().attr("data-key");
        match (id, data_confid, data_key) {
            (id, Some(confid), Some(key)) if !id.is_empty() => confirmations.push(Confirmation {
                id: id.to_string(),
                data_confid: confid.to_string(),
                data_key: key.to_string(),
            }),
            _ => {
                return Err(Error::ConfirmationPageParse(format!(
                    "list entry missing id or tamper tokens: {dom_id:?}"
                )));
            }
        }
    }
    Ok(confirmations)
}

/// Extract the trade-offer id from a detail view: the `.tradeoffer` element's
/// DOM id is `tradeoffer_<id>`.
fn extract_trade_offer_id(details_html: &str) -> Result<String> {
    let document = Html::parse_document(details_html);
    let selector = Selector::parse(".tradeoffer").expect("valid selector");
    let element = document.select(&selector).next().ok_or_else(|| {
        Error::ConfirmationPageParse("detail view carries no tradeoffer element".to_string())
    })?;
    let dom_id = element.value().attr("id").unwrap_or_default();
    dom_id
        .split('_')
        .nth(1)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            Error::ConfirmationPageParse(format!("unexpected tradeoffer element id: {dom_id:?}"))
        })
}

/// Extract the listed asset id from a detail view: the inline `confiteminfo`
/// script payload between the known delimiters is JSON with an `id` field.
fn extract_sell_listing_id(details_html: &str) -> Result<String> {
    let raw = text_between(details_html, "'confiteminfo', ", ", UserYou").ok_or_else(|| {
        Error::ConfirmationPageParse("detail view carries no confiteminfo payload".to_string())
    })?;
    let payload: serde_json::Value = serde_json::from_str(&raw.replace('\n', ""))
        .map_err(|e| Error::ConfirmationPageParse(format!("confiteminfo is not JSON: {e}")))?;
    match &payload["id"] {
        serde_json::Value::String(id) => Ok(id.clone()),
        serde_json::Value::Number(id) => Ok(id.to_string()),
        _ => Err(Error::ConfirmationPageParse(
            "confiteminfo payload carries no id".to_string(),
        )),
    }
}
