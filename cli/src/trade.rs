//! Trade offer and inventory operations: thin wrappers over the established
//! session, plus the mobile-confirmation handoff for offers that need it.

use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::{Value, json};

use crate::client::SteamClient;
use crate::models::{Asset, Error, GameOptions, Result, TradeOfferState};
use crate::scrape;

/// Marker the provider renders on offers blocked by a new-device hold.
const SEVEN_DAYS_HOLD_MARKER: &str =
    "You have logged in from a new device. In order to protect the items";

/// Options for [`SteamClient::get_trade_history`].
#[derive(Debug, Clone)]
pub struct TradeHistoryOptions {
    /// Maximum number of trades returned.
    pub max_trades: u32,
    /// Only trades after this unix time.
    pub start_after_time: Option<u64>,
    /// Only trades after this trade id.
    pub start_after_tradeid: Option<String>,
    /// Include item descriptions in the response.
    pub get_descriptions: bool,
    /// Page backwards through history.
    pub navigating_back: bool,
    /// Include failed trades.
    pub include_failed: bool,
    /// Include the total trade count.
    pub include_total: bool,
}

impl Default for TradeHistoryOptions {
    fn default() -> Self {
        Self {
            max_trades: 100,
            start_after_time: None,
            start_after_tradeid: None,
            get_descriptions: true,
            navigating_back: true,
            include_failed: true,
            include_total: true,
        }
    }
}

impl SteamClient {
    /// Counts of pending sent/received offers.
    pub async fn get_trade_offers_summary(&self) -> Result<Value> {
        let params = [("key", self.api_key()?.to_string())];
        let body = self
            .api_call(Method::GET, "CEconService", "GetTradeOffersSummary", "v1", &params)
            .await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Active sent and received offers, with non-active offers filtered out
    /// and (optionally) item descriptions merged in.
    pub async fn get_trade_offers(&self, merge: bool) -> Result<Value> {
        let params = [
            ("key", self.api_key()?.to_string()),
            ("get_sent_offers", "1".to_string()),
            ("get_received_offers", "1".to_string()),
            ("get_descriptions", "1".to_string()),
            ("language", "english".to_string()),
            ("active_only", "1".to_string()),
            ("historical_only", "0".to_string()),
            ("time_historical_cutoff", String::new()),
        ];
        let body = self
            .api_call(Method::GET, "CEconService", "GetTradeOffers", "v1", &params)
            .await?;
        let mut response: Value = serde_json::from_str(&body)?;
        filter_non_active_offers(&mut response);
        if merge {
            response = scrape::merge_items_with_descriptions_from_offers(&response)?;
        }
        Ok(response)
    }

    /// One offer by id.
    pub async fn get_trade_offer(&self, trade_offer_id: &str, merge: bool) -> Result<Value> {
        let params = [
            ("key", self.api_key()?.to_string()),
            ("tradeofferid", trade_offer_id.to_string()),
            ("language", "english".to_string()),
        ];
        let body = self
            .api_call(Method::GET, "CEconService", "GetTradeOffer", "v1", &params)
            .await?;
        let mut response: Value = serde_json::from_str(&body)?;
        if merge && !response["response"]["descriptions"].is_null() {
            let mut descriptions = std::collections::HashMap::new();
            if let Some(list) = response["response"]["descriptions"].as_array() {
                for description in list {
                    if let Some(key) = scrape::get_description_key(description) {
                        descriptions.insert(key, description.clone());
                    }
                }
            }
            let offer = response["response"]["offer"].clone();
            response["response"]["offer"] =
                scrape::merge_items_with_descriptions_from_offer(&offer, &descriptions)?;
        }
        Ok(response)
    }

    /// Completed trade history.
    pub async fn get_trade_history(&self, options: &TradeHistoryOptions) -> Result<Value> {
        let params = [
            ("key", self.api_key()?.to_string()),
            ("max_trades", options.max_trades.to_string()),
            (
                "start_after_time",
                options.start_after_time.map(|t| t.to_string()).unwrap_or_default(),
            ),
            (
                "start_after_tradeid",
                options.start_after_tradeid.clone().unwrap_or_default(),
            ),
            ("get_descriptions", options.get_descriptions.to_string()),
            ("navigating_back", options.navigating_back.to_string()),
            ("include_failed", options.include_failed.to_string()),
            ("include_total", options.include_total.to_string()),
        ];
        let body = self
            .api_call(Method::GET, "IEconService", "GetTradeHistory", "v1", &params)
            .await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Accept a received offer, running the mobile confirmation when the
    /// provider asks for one.
    pub async fn accept_trade_offer(&self, trade_offer_id: &str) -> Result<Value> {
        self.ensure_authenticated()?;
        let trade = self.get_trade_offer(trade_offer_id, true).await?;
        let state_raw = trade["response"]["offer"]["trade_offer_state"]
            .as_u64()
            .ok_or_else(|| Error::Api("offer carries no state".to_string()))?;
        let state = TradeOfferState::from_u64(state_raw);
        if state != TradeOfferState::Active {
            return Err(Error::Api(format!(
                "invalid trade offer state: {state:?} ({state_raw})"
            )));
        }

        let partner = self.fetch_trade_partner_id(trade_offer_id).await?;
        let session_id = self.session_id_required()?;
        let form = [
            ("sessionid", session_id),
            ("tradeofferid", trade_offer_id.to_string()),
            ("serverid", "1".to_string()),
            ("partner", partner),
            ("captcha", String::new()),
        ];
        let mut headers = HeaderMap::new();
        headers.insert(
            "Referer",
            header_value(&trade_offer_url(self, trade_offer_id)),
        );
        let url = self
            .api()
            .community_url(&format!("/tradeoffer/{trade_offer_id}/accept"));
        let response = self.api().post_form_with_headers(url, &form, headers).await?;
        let data: Value = response.json().await?;

        if data["needs_mobile_confirmation"].as_bool().unwrap_or(false) {
            let outcome = self.confirm_trade_offer(trade_offer_id).await?;
            return Ok(serde_json::to_value(outcome)?);
        }
        Ok(data)
    }

    /// Decline a received offer.
    pub async fn decline_trade_offer(&self, trade_offer_id: &str) -> Result<Value> {
        let params = [
            ("key", self.api_key()?.to_string()),
            ("tradeofferid", trade_offer_id.to_string()),
        ];
        let body = self
            .api_call(Method::POST, "IEconService", "DeclineTradeOffer", "v1", &params)
            .await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Cancel a sent offer.
    pub async fn cancel_trade_offer(&self, trade_offer_id: &str) -> Result<Value> {
        let params = [
            ("key", self.api_key()?.to_string()),
            ("tradeofferid", trade_offer_id.to_string()),
        ];
        let body = self
            .api_call(Method::POST, "IEconService", "CancelTradeOffer", "v1", &params)
            .await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Send a new offer to a partner identified by steam id.
    pub async fn make_offer(
        &self,
        items_from_me: &[Asset],
        items_from_them: &[Asset],
        partner_steam_id: &str,
        message: &str,
    ) -> Result<Value> {
        self.ensure_authenticated()?;
        let offer = offer_payload(items_from_me, items_from_them);
        let session_id = self.session_id_required()?;
        let partner_account_id = scrape::steam_id_to_account_id(partner_steam_id)?;

        let form = [
            ("sessionid", session_id),
            ("serverid", "1".to_string()),
            ("partner", partner_steam_id.to_string()),
            ("tradeoffermessage", message.to_string()),
            ("json_tradeoffer", serde_json::to_string(&offer)?),
            ("captcha", String::new()),
            ("trade_offer_create_params", "{}".to_string()),
        ];
        let referer = self
            .api()
            .community_url(&format!("/tradeoffer/new/?partner={partner_account_id}"));
        let mut headers = HeaderMap::new();
        headers.insert("Referer", header_value(referer.as_str()));
        headers.insert("Origin", header_value(self.api().urls().community.as_str()));

        let url = self.api().community_url("/tradeoffer/new/send");
        let response = self.api().post_form_with_headers(url, &form, headers).await?;
        let mut data: Value = response.json().await?;

        if data["needs_mobile_confirmation"].as_bool().unwrap_or(false) {
            let offer_id = data["tradeofferid"]
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| Error::Api("offer response carries no tradeofferid".to_string()))?;
            let outcome = self.confirm_trade_offer(&offer_id).await?;
            data["mobile_confirmation"] = serde_json::to_value(outcome)?;
        }
        Ok(data)
    }

    /// Send a new offer through a trade URL (token-authenticated partner).
    pub async fn make_offer_with_url(
        &self,
        items_from_me: &[Asset],
        items_from_them: &[Asset],
        trade_offer_url: &str,
        message: &str,
    ) -> Result<Value> {
        self.ensure_authenticated()?;
        let token = scrape::get_key_value_from_url(trade_offer_url, "token")?;
        let partner_account_id = scrape::get_key_value_from_url(trade_offer_url, "partner")?;
        let partner_steam_id = scrape::account_id_to_steam_id(&partner_account_id)?;
        let offer = offer_payload(items_from_me, items_from_them);
        let session_id = self.session_id_required()?;

        let form = [
            ("sessionid", session_id),
            ("serverid", "1".to_string()),
            ("partner", partner_steam_id),
            ("tradeoffermessage", message.to_string()),
            ("json_tradeoffer", serde_json::to_string(&offer)?),
            ("captcha", String::new()),
            (
                "trade_offer_create_params",
                serde_json::to_string(&json!({ "trade_offer_access_token": token }))?,
            ),
        ];
        let mut headers = HeaderMap::new();
        headers.insert("Referer", header_value(trade_offer_url));
        headers.insert("Origin", header_value(self.api().urls().community.as_str()));

        let url = self.api().community_url("/tradeoffer/new/send");
        let response = self.api().post_form_with_headers(url, &form, headers).await?;
        let mut data: Value = response.json().await?;

        if data["needs_mobile_confirmation"].as_bool().unwrap_or(false) {
            let offer_id = data["tradeofferid"]
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| Error::Api("offer response carries no tradeofferid".to_string()))?;
            let outcome = self.confirm_trade_offer(&offer_id).await?;
            data["mobile_confirmation"] = serde_json::to_value(outcome)?;
        }
        Ok(data)
    }

    /// Items exchanged in a completed trade, parsed from the receipt page.
    pub async fn get_trade_receipt(&self, trade_id: &str) -> Result<Vec<Value>> {
        self.ensure_authenticated()?;
        let url = self.api().community_url(&format!("/trade/{trade_id}/receipt"));
        let response = self.api().request(Method::GET, url).send().await?;
        let page = response.text().await?;
        let mut items = Vec::new();
        for raw in scrape::texts_between(&page, "oItem = ", ";\r\n\toItem") {
            items.push(serde_json::from_str(raw)?);
        }
        Ok(items)
    }

    /// The longer of the two escrow durations an offer would incur.
    pub async fn get_escrow_duration(&self, trade_offer_url: &str) -> Result<u32> {
        self.ensure_authenticated()?;
        let referer_path = reqwest::Url::parse(trade_offer_url)
            .map_err(|e| Error::Api(format!("bad trade url {trade_offer_url}: {e}")))?
            .path()
            .to_string();
        let mut headers = HeaderMap::new();
        headers.insert(
            "Referer",
            header_value(self.api().community_url(&referer_path).as_str()),
        );
        headers.insert("Origin", header_value(self.api().urls().community.as_str()));

        let url = reqwest::Url::parse(trade_offer_url)
            .map_err(|e| Error::Api(format!("bad trade url {trade_offer_url}: {e}")))?;
        let response = self.api().get(url, &[], headers).await?;
        let page = response.text().await?;

        let mine: u32 = scrape::text_between(&page, "var g_daysMyEscrow = ", ";")
            .and_then(|v| v.trim().parse().ok())
            .ok_or_else(|| Error::Api("offer page carries no escrow durations".to_string()))?;
        let theirs: u32 = scrape::text_between(&page, "var g_daysTheirEscrow = ", ";")
            .and_then(|v| v.trim().parse().ok())
            .ok_or_else(|| Error::Api("offer page carries no escrow durations".to_string()))?;
        Ok(mine.max(theirs))
    }

    /// The logged-in account's inventory for one game.
    pub async fn get_my_inventory(&self, game: &GameOptions, merge: bool) -> Result<Value> {
        self.ensure_authenticated()?;
        let url = self.api().community_url(&format!(
            "/my/inventory/json/{}/{}",
            game.app_id, game.context_id
        ));
        let response = self.api().request(Method::GET, url).send().await?;
        let inventory: Value = response.json().await?;
        if merge {
            return scrape::merge_items_with_descriptions_from_inventory(
                &inventory,
                &game.context_id,
            );
        }
        Ok(inventory)
    }

    /// A trade partner's inventory, as shown in the trade window.
    pub async fn get_partner_inventory(
        &self,
        partner_steam_id: &str,
        game: &GameOptions,
        merge: bool,
    ) -> Result<Value> {
        self.ensure_authenticated()?;
        let session_id = self.session_id_required()?;
        let params = [
            ("sessionid", session_id),
            ("partner", partner_steam_id.to_string()),
            ("appid", game.app_id.clone()),
            ("contextid", game.context_id.clone()),
        ];
        let partner_account_id = scrape::steam_id_to_account_id(partner_steam_id)?;
        let referer = self
            .api()
            .community_url(&format!("/tradeoffer/new/?partner={partner_account_id}"));
        let mut headers = HeaderMap::new();
        headers.insert("X-Requested-With", HeaderValue::from_static("XMLHttpRequest"));
        headers.insert("Referer", header_value(referer.as_str()));
        headers.insert("X-Prototype-Version", HeaderValue::from_static("1.7"));

        let url = self.api().community_url("/tradeoffer/new/partnerinventory/");
        let response = self.api().get(url, &params, headers).await?;
        let inventory: Value = response.json().await?;
        if merge {
            return scrape::merge_items_with_descriptions_from_inventory(
                &inventory,
                &game.context_id,
            );
        }
        Ok(inventory)
    }

    /// Public profile summary for one account.
    pub async fn get_profile(&self, steam_id: &str) -> Result<Value> {
        let params = [
            ("steamids", steam_id.to_string()),
            ("key", self.api_key()?.to_string()),
        ];
        let body = self
            .api_call(Method::GET, "ISteamUser", "GetPlayerSummaries", "v0002", &params)
            .await?;
        let data: Value = serde_json::from_str(&body)?;
        Ok(data["response"]["players"][0].clone())
    }

    /// Whether a trade URL belongs to the expected partner.
    pub async fn is_trade_link_correct(&self, trade_link: &str, steam_id: &str) -> Result<bool> {
        self.ensure_authenticated()?;
        let url = reqwest::Url::parse(trade_link)
            .map_err(|e| Error::Api(format!("bad trade url {trade_link}: {e}")))?;
        let mut headers = HeaderMap::new();
        headers.insert(
            "Referer",
            header_value(self.api().community_url(url.path()).as_str()),
        );
        headers.insert("Origin", header_value(self.api().urls().community.as_str()));
        let response = self.api().get(url, &[], headers).await?;
        let page = response.text().await?;
        let their_steam_id =
            scrape::text_between(&page, "var g_ulTradePartnerSteamID = '", "';")
                .ok_or_else(|| Error::Api("trade page carries no partner id".to_string()))?;
        Ok(their_steam_id == steam_id)
    }

    /// The partner's steam id, scraped from the offer page.
    async fn fetch_trade_partner_id(&self, trade_offer_id: &str) -> Result<String> {
        let url = self
            .api()
            .community_url(&format!("/tradeoffer/{trade_offer_id}"));
        let response = self.api().request(Method::GET, url).send().await?;
        let page = response.text().await?;
        if page.contains(SEVEN_DAYS_HOLD_MARKER) {
            return Err(Error::SevenDaysHold);
        }
        scrape::text_between(&page, "var g_ulTradePartnerSteamID = '", "';")
            .map(str::to_string)
            .ok_or_else(|| Error::Api("offer page carries no partner id".to_string()))
    }
}

fn trade_offer_url(client: &SteamClient, trade_offer_id: &str) -> String {
    client
        .api()
        .community_url(&format!("/tradeoffer/{trade_offer_id}"))
        .to_string()
}

fn header_value(value: &str) -> HeaderValue {
    HeaderValue::from_str(value).unwrap_or(HeaderValue::from_static(""))
}

/// The offer JSON the trade endpoints expect.
fn offer_payload(items_from_me: &[Asset], items_from_them: &[Asset]) -> Value {
    json!({
        "newversion": true,
        "version": 4,
        "me": {
            "assets": items_from_me.iter().map(Asset::to_value).collect::<Vec<_>>(),
            "currency": [],
            "ready": false,
        },
        "them": {
            "assets": items_from_them.iter().map(Asset::to_value).collect::<Vec<_>>(),
            "currency": [],
            "ready": false,
        },
    })
}

fn filter_non_active_offers(response: &mut Value) {
    for side in ["trade_offers_received", "trade_offers_sent"] {
        if let Some(offers) = response["response"][side].as_array() {
            let active: Vec<Value> = offers
                .iter()
                .filter(|offer| {
                    offer["trade_offer_state"].as_u64().map(TradeOfferState::from_u64)
                        == Some(TradeOfferState::Active)
                })
                .cloned()
                .collect();
            response["response"][side] = Value::Array(active);
        }
    }
}
