//! Market operations: price queries, listings, buy/sell orders, and the
//! mobile-confirmation handoff for new sell listings.

use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::Value;

use crate::client::SteamClient;
use crate::models::{Currency, Error, GameOptions, Result};
use crate::scrape;

/// Market operations bound to a [`SteamClient`] session.
pub struct Market<'a> {
    client: &'a SteamClient,
}

impl<'a> Market<'a> {
    pub(crate) fn new(client: &'a SteamClient) -> Self {
        Self { client }
    }

    /// Price overview for one item. Does not require a login.
    ///
    /// # Errors
    /// [`Error::RateLimited`] on HTTP 429; the endpoint allows roughly 20
    /// queries per minute.
    pub async fn fetch_price(
        &self,
        item_hash_name: &str,
        game: &GameOptions,
        currency: Currency,
    ) -> Result<Value> {
        let params = [
            ("country", "PL".to_string()),
            ("currency", currency.as_u32().to_string()),
            ("appid", game.app_id.clone()),
            ("market_hash_name", item_hash_name.to_string()),
        ];
        let url = self.client.api().community_url("/market/priceoverview/");
        let response = self.client.api().get(url, &params, HeaderMap::new()).await?;
        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimited);
        }
        Ok(response.json().await?)
    }

    /// The account's sell listings and buy orders, following the pagination
    /// of the listings page when more are available than shown.
    pub async fn get_my_market_listings(&self) -> Result<Value> {
        self.client.ensure_authenticated()?;
        let url = self.client.api().community_url("/market");
        let response = self.client.api().request(Method::GET, url).send().await?;
        if response.status() != reqwest::StatusCode::OK {
            return Err(Error::Api(format!(
                "listings page returned http {}",
                response.status()
            )));
        }
        let page = response.text().await?;

        let assets_raw = scrape::text_between(&page, "var g_rgAssets = ", ";\r\n")
            .ok_or_else(|| Error::Api("listings page carries no asset map".to_string()))?;
        let assets_descriptions: Value = serde_json::from_str(assets_raw)?;
        let addresses = scrape::get_listing_id_to_assets_address_from_html(&page);
        let mut listings = scrape::merge_items_with_descriptions_from_listing(
            scrape::get_market_listings_from_html(&page)?,
            &addresses,
            &assets_descriptions,
        )?;

        if page.contains(r#"<span id="tabContentsMyActiveMarketListings_end">"#) {
            let n_showing: u64 =
                scrape::text_between(&page, r#"<span id="tabContentsMyActiveMarketListings_end">"#, "</span>")
                    .and_then(|v| v.trim().parse().ok())
                    .ok_or_else(|| Error::Api("listings page carries no paging counts".to_string()))?;
            let n_total: u64 =
                scrape::text_between(&page, r#"<span id="tabContentsMyActiveMarketListings_total">"#, "</span>")
                    .and_then(|v| v.trim().parse().ok())
                    .ok_or_else(|| Error::Api("listings page carries no paging counts".to_string()))?;

            if n_total > n_showing {
                let url = self.client.api().community_url(&format!(
                    "/market/mylistings/render/?query=&start={n_showing}&count=-1"
                ));
                let remaining = self.client.api().request(Method::GET, url).send().await?;
                if remaining.status() != reqwest::StatusCode::OK {
                    return Err(Error::Api(format!(
                        "remaining listings returned http {}",
                        remaining.status()
                    )));
                }
                // Parse the paginated response itself, then merge its
                // listings with the first page's.
                let rendered: Value = remaining.json().await?;
                let hovers = rendered["hovers"].as_str().unwrap_or_default();
                let results_html = rendered["results_html"].as_str().unwrap_or_default();
                let more_addresses = scrape::get_listing_id_to_assets_address_from_html(hovers);
                let more_listings = scrape::merge_items_with_descriptions_from_listing(
                    scrape::get_market_listings_from_html(results_html)?,
                    &more_addresses,
                    &rendered["assets"],
                )?;
                merge_sell_listings(&mut listings, more_listings)?;
            }
        }
        Ok(listings)
    }

    /// List an item for sale. Runs the mobile confirmation when the provider
    /// asks for one.
    ///
    /// `money_to_receive` is the seller-side price in cents.
    pub async fn create_sell_order(
        &self,
        asset_id: &str,
        game: &GameOptions,
        money_to_receive: &str,
    ) -> Result<Value> {
        self.client.ensure_authenticated()?;
        let session_id = self.client.session_id_required()?;
        let steam_id = self.client.guard()?.steam_id.clone();
        let form = [
            ("assetid", asset_id.to_string()),
            ("sessionid", session_id),
            ("contextid", game.context_id.clone()),
            ("appid", game.app_id.clone()),
            ("amount", "1".to_string()),
            ("price", money_to_receive.to_string()),
        ];
        let referer = self
            .client
            .api()
            .community_url(&format!("/profiles/{steam_id}/inventory"));
        let mut headers = HeaderMap::new();
        headers.insert(
            "Referer",
            HeaderValue::from_str(referer.as_str()).unwrap_or(HeaderValue::from_static("")),
        );

        let url = self.client.api().community_url("/market/sellitem/");
        let response = self
            .client
            .api()
            .post_form_with_headers(url, &form, headers)
            .await?;
        let data: Value = response.json().await?;

        if data["needs_mobile_confirmation"].as_bool().unwrap_or(false) {
            let outcome = self.client.confirm_sell_listing(asset_id).await?;
            return Ok(serde_json::to_value(outcome)?);
        }
        Ok(data)
    }

    /// Place a buy order for an item.
    pub async fn create_buy_order(
        &self,
        market_name: &str,
        price_single_item_cents: u64,
        quantity: u64,
        game: &GameOptions,
        currency: Currency,
    ) -> Result<Value> {
        self.client.ensure_authenticated()?;
        let session_id = self.client.session_id_required()?;
        let form = [
            ("sessionid", session_id),
            ("currency", currency.as_u32().to_string()),
            ("appid", game.app_id.clone()),
            ("market_hash_name", market_name.to_string()),
            (
                "price_total",
                (price_single_item_cents * quantity).to_string(),
            ),
            ("quantity", quantity.to_string()),
        ];
        let referer = self.client.api().community_url(&format!(
            "/market/listings/{}/{}",
            game.app_id,
            urlencoding::encode(market_name)
        ));
        let mut headers = HeaderMap::new();
        headers.insert(
            "Referer",
            HeaderValue::from_str(referer.as_str()).unwrap_or(HeaderValue::from_static("")),
        );

        let url = self.client.api().community_url("/market/createbuyorder/");
        let response = self
            .client
            .api()
            .post_form_with_headers(url, &form, headers)
            .await?;
        let data: Value = response.json().await?;
        if data["success"].as_u64() != Some(1) {
            return Err(Error::Api(format!(
                "buy order was not created (success: {}); check the wallet currency",
                data["success"]
            )));
        }
        Ok(data)
    }

    /// Remove one of the account's sell listings.
    pub async fn cancel_sell_order(&self, sell_listing_id: &str) -> Result<()> {
        self.client.ensure_authenticated()?;
        let session_id = self.client.session_id_required()?;
        let form = [("sessionid", session_id)];
        let mut headers = HeaderMap::new();
        headers.insert(
            "Referer",
            HeaderValue::from_str(self.client.api().community_url("/market/").as_str())
                .unwrap_or(HeaderValue::from_static("")),
        );
        let url = self
            .client
            .api()
            .community_url(&format!("/market/removelisting/{sell_listing_id}"));
        let response = self
            .client
            .api()
            .post_form_with_headers(url, &form, headers)
            .await?;
        if response.status() != reqwest::StatusCode::OK {
            return Err(Error::Api(format!(
                "listing removal returned http {}",
                response.status()
            )));
        }
        response.bytes().await?;
        Ok(())
    }

    /// Cancel one of the account's buy orders.
    pub async fn cancel_buy_order(&self, buy_order_id: &str) -> Result<Value> {
        self.client.ensure_authenticated()?;
        let session_id = self.client.session_id_required()?;
        let form = [
            ("sessionid", session_id),
            ("buy_orderid", buy_order_id.to_string()),
        ];
        let mut headers = HeaderMap::new();
        headers.insert(
            "Referer",
            HeaderValue::from_str(self.client.api().community_url("/market").as_str())
                .unwrap_or(HeaderValue::from_static("")),
        );
        let url = self.client.api().community_url("/market/cancelbuyorder/");
        let response = self
            .client
            .api()
            .post_form_with_headers(url, &form, headers)
            .await?;
        let data: Value = response.json().await?;
        if data["success"].as_u64() != Some(1) {
            return Err(Error::Api(format!(
                "buy order was not canceled (success: {})",
                data["success"]
            )));
        }
        Ok(data)
    }
}

/// Fold a second page of sell listings into the first.
fn merge_sell_listings(listings: &mut Value, more: Value) -> Result<()> {
    let target = listings["sell_listings"]
        .as_object_mut()
        .ok_or_else(|| Error::Api("listings carry no sell_listings".to_string()))?;
    if let Some(extra) = more["sell_listings"].as_object() {
        for (listing_id, listing) in extra {
            target.insert(listing_id.clone(), listing.clone());
        }
    }
    Ok(())
}
