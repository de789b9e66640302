//! Extraction helpers for the HTML and JSON shapes the provider embeds data
//! in: substring slicing, inventory/offer description merging, market
//! listings parsing, id conversions.

use std::collections::HashMap;

use regex::Regex;
use scraper::{Html, Selector};
use serde_json::{Map, Value, json};

use crate::models::{Error, Result};

/// Offset between a 64-bit steam id and its 32-bit account id.
const STEAM_ID_OFFSET: u64 = 76_561_197_960_265_728;

/// The first substring of `text` strictly between `begin` and `end`.
pub fn text_between<'t>(text: &'t str, begin: &str, end: &str) -> Option<&'t str> {
    let start = text.find(begin)? + begin.len();
    let stop = text[start..].find(end)? + start;
    Some(&text[start..stop])
}

/// Every substring of `text` strictly between consecutive `begin`/`end`
/// pairs, in order of appearance.
pub fn texts_between<'t>(text: &'t str, begin: &str, end: &str) -> Vec<&'t str> {
    let mut found = Vec::new();
    let mut stop = 0;
    loop {
        let Some(rel_start) = text[stop..].find(begin) else {
            break;
        };
        let start = stop + rel_start + begin.len();
        let Some(rel_stop) = text[start..].find(end) else {
            break;
        };
        // The scan resumes at the end delimiter itself: begin and end tokens
        // may overlap in the wild (the receipt format interleaves them).
        stop = start + rel_stop;
        found.push(&text[start..stop]);
    }
    found
}

/// Convert a 64-bit steam id to its 32-bit account id.
pub fn steam_id_to_account_id(steam_id: &str) -> Result<String> {
    let id: u64 = steam_id
        .parse()
        .map_err(|_| Error::Api(format!("not a steam id: {steam_id}")))?;
    Ok((id & 0xFFFF_FFFF).to_string())
}

/// Convert a 32-bit account id to its 64-bit steam id.
pub fn account_id_to_steam_id(account_id: &str) -> Result<String> {
    let id: u64 = account_id
        .parse()
        .map_err(|_| Error::Api(format!("not an account id: {account_id}")))?;
    Ok((id + STEAM_ID_OFFSET).to_string())
}

/// A query parameter value from a trade offer URL.
pub fn get_key_value_from_url(url: &str, key: &str) -> Result<String> {
    let parsed =
        reqwest::Url::parse(url).map_err(|e| Error::Api(format!("bad trade url {url}: {e}")))?;
    parsed
        .query_pairs()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.into_owned())
        .ok_or_else(|| Error::Api(format!("trade url carries no {key} parameter")))
}

/// The description-lookup key of an item: `classid_instanceid`.
pub fn get_description_key(item: &Value) -> Option<String> {
    let class_id = item["classid"].as_str()?;
    let instance_id = item["instanceid"].as_str()?;
    Some(format!("{class_id}_{instance_id}"))
}

fn as_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Join items with their descriptions, keyed by asset id.
fn merge_items(
    items: &[Value],
    descriptions: &HashMap<String, Value>,
    context_id: Option<&str>,
) -> Result<Value> {
    let mut merged = Map::new();
    for item in items {
        let key = get_description_key(item)
            .ok_or_else(|| Error::Api("item carries no class/instance id".to_string()))?;
        let mut description = descriptions
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::Api(format!("no description for item {key}")))?;
        if !description.is_object() {
            return Err(Error::Api(format!("description for item {key} is not an object")));
        }
        let item_id = as_id(&item["id"])
            .or_else(|| as_id(&item["assetid"]))
            .ok_or_else(|| Error::Api("item carries no asset id".to_string()))?;
        let context = as_id(&item["contextid"])
            .or_else(|| context_id.map(str::to_string))
            .ok_or_else(|| Error::Api("item carries no context id".to_string()))?;
        description["contextid"] = Value::String(context);
        description["id"] = Value::String(item_id.clone());
        description["amount"] = item["amount"].clone();
        merged.insert(item_id, description);
    }
    Ok(Value::Object(merged))
}

/// Merge an inventory response's `rgInventory` with its `rgDescriptions`.
pub fn merge_items_with_descriptions_from_inventory(
    inventory_response: &Value,
    context_id: &str,
) -> Result<Value> {
    let items: Vec<Value> = inventory_response["rgInventory"]
        .as_object()
        .map(|m| m.values().cloned().collect())
        .ok_or_else(|| Error::Api("inventory response carries no rgInventory".to_string()))?;
    let descriptions = description_map(&inventory_response["rgDescriptions"])?;
    merge_items(&items, &descriptions, Some(context_id))
}

fn description_map(descriptions: &Value) -> Result<HashMap<String, Value>> {
    let object = descriptions
        .as_object()
        .ok_or_else(|| Error::Api("response carries no descriptions".to_string()))?;
    Ok(object
        .iter()
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect())
}

/// Merge one offer's item lists against a description lookup.
pub fn merge_items_with_descriptions_from_offer(
    offer: &Value,
    descriptions: &HashMap<String, Value>,
) -> Result<Value> {
    let mut merged = offer.clone();
    for side in ["items_to_give", "items_to_receive"] {
        let items: Vec<Value> = offer[side].as_array().cloned().unwrap_or_default();
        merged[side] = merge_items(&items, descriptions, None)?;
    }
    Ok(merged)
}

/// Merge every offer in a GetTradeOffers response with the response's
/// description list (keyed by `classid_instanceid`).
pub fn merge_items_with_descriptions_from_offers(offers_response: &Value) -> Result<Value> {
    let mut descriptions = HashMap::new();
    if let Some(list) = offers_response["response"]["descriptions"].as_array() {
        for description in list {
            if let Some(key) = get_description_key(description) {
                descriptions.insert(key, description.clone());
            }
        }
    }

    let mut merged = offers_response.clone();
    for side in ["trade_offers_received", "trade_offers_sent"] {
        let offers: Vec<Value> = offers_response["response"][side]
            .as_array()
            .cloned()
            .unwrap_or_default();
        let mut merged_offers = Vec::with_capacity(offers.len());
        for offer in &offers {
            merged_offers.push(merge_items_with_descriptions_from_offer(offer, &descriptions)?);
        }
        merged["response"][side] = Value::Array(merged_offers);
    }
    Ok(merged)
}

/// Map listing id -> `[app_id, context_id, asset_id]` from the hover-script
/// calls embedded in a listings page.
pub fn get_listing_id_to_assets_address_from_html(html: &str) -> HashMap<String, Value> {
    let regex = Regex::new(
        r"CreateItemHoverFromContainer\( \w+, 'mylisting_(\d+)_\w+', (\d+), '(\d+)', '(\d+)', \d+ \);",
    )
    .expect("valid regex");
    let mut addresses = HashMap::new();
    for captures in regex.captures_iter(html) {
        addresses.insert(
            captures[1].to_string(),
            json!([
                captures[2].to_string(),
                captures[3].to_string(),
                captures[4].to_string()
            ]),
        );
    }
    addresses
}

/// Parse sell listing rows (`id="mylisting_<id>"`) out of listings markup.
pub fn get_market_listings_from_html(html: &str) -> Result<Value> {
    let document = Html::parse_document(html);
    let sell_rows = Selector::parse(r#"div[id^="mylisting_"]"#).expect("valid selector");
    let buy_rows = Selector::parse(r#"div[id^="mybuyorder_"]"#).expect("valid selector");
    let name = Selector::parse(".market_listing_item_name").expect("valid selector");
    let price = Selector::parse(".market_listing_price").expect("valid selector");

    let mut sell_listings = Map::new();
    for row in document.select(&sell_rows) {
        let dom_id = row.value().attr("id").unwrap_or_default();
        let Some(listing_id) = dom_id.strip_prefix("mylisting_") else {
            continue;
        };
        // Hover containers reuse the prefix with a suffixed element name.
        if listing_id.contains('_') {
            continue;
        }
        let item_name = row
            .select(&name)
            .next()
            .map(|e| e.text().collect::<String>().trim().to_string())
            .unwrap_or_default();
        let listed_price = row
            .select(&price)
            .next()
            .map(|e| e.text().collect::<String>().trim().to_string())
            .unwrap_or_default();
        sell_listings.insert(
            listing_id.to_string(),
            json!({
                "listing_id": listing_id,
                "item_name": item_name,
                "price": listed_price,
            }),
        );
    }

    let mut buy_orders = Map::new();
    for row in document.select(&buy_rows) {
        let dom_id = row.value().attr("id").unwrap_or_default();
        let Some(order_id) = dom_id.strip_prefix("mybuyorder_") else {
            continue;
        };
        if order_id.contains('_') {
            continue;
        }
        let item_name = row
            .select(&name)
            .next()
            .map(|e| e.text().collect::<String>().trim().to_string())
            .unwrap_or_default();
        let order_price = row
            .select(&price)
            .next()
            .map(|e| e.text().collect::<String>().trim().to_string())
            .unwrap_or_default();
        buy_orders.insert(
            order_id.to_string(),
            json!({
                "order_id": order_id,
                "item_name": item_name,
                "price": order_price,
            }),
        );
    }

    Ok(json!({
        "sell_listings": Value::Object(sell_listings),
        "buy_orders": Value::Object(buy_orders),
    }))
}

/// Attach hover addresses and asset descriptions to parsed sell listings.
pub fn merge_items_with_descriptions_from_listing(
    mut listings: Value,
    listing_id_to_assets_address: &HashMap<String, Value>,
    assets_descriptions: &Value,
) -> Result<Value> {
    let sell_listings = listings["sell_listings"]
        .as_object_mut()
        .ok_or_else(|| Error::Api("listings carry no sell_listings".to_string()))?;
    for (listing_id, listing) in sell_listings.iter_mut() {
        let Some(address) = listing_id_to_assets_address.get(listing_id) else {
            continue;
        };
        let (Some(app_id), Some(context_id), Some(asset_id)) = (
            address[0].as_str(),
            address[1].as_str(),
            address[2].as_str(),
        ) else {
            continue;
        };
        let description = &assets_descriptions[app_id][context_id][asset_id];
        if !description.is_null() {
            listing["description"] = description.clone();
        }
    }
    Ok(listings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_between() {
        let text = "var g_daysMyEscrow = 15;";
        assert_eq!(text_between(text, "g_daysMyEscrow = ", ";"), Some("15"));
        assert_eq!(text_between(text, "missing", ";"), None);
        assert_eq!(text_between(text, "g_daysMyEscrow = ", "missing"), None);
    }

    #[test]
    fn test_texts_between() {
        let text = "oItem = {\"a\":1};\r\n\toItem = {\"b\":2};\r\n\toItem";
        let found = texts_between(text, "oItem = ", ";\r\n\toItem");
        assert_eq!(found, vec!["{\"a\":1}", "{\"b\":2}"]);
    }

    #[test]
    fn test_id_conversions_round_trip() {
        let steam_id = "76561197960287930";
        let account_id = steam_id_to_account_id(steam_id).unwrap();
        assert_eq!(account_id, "22202");
        assert_eq!(account_id_to_steam_id(&account_id).unwrap(), steam_id);
        assert!(steam_id_to_account_id("garbage").is_err());
    }

    #[test]
    fn test_get_key_value_from_url() {
        let url = "https://steamcommunity.com/tradeoffer/new/?partner=22202&token=ab-cdEF12";
        assert_eq!(get_key_value_from_url(url, "partner").unwrap(), "22202");
        assert_eq!(get_key_value_from_url(url, "token").unwrap(), "ab-cdEF12");
        assert!(get_key_value_from_url(url, "missing").is_err());
    }

    #[test]
    fn test_merge_inventory() {
        let response = json!({
            "rgInventory": {
                "1001": {"id": "1001", "classid": "10", "instanceid": "0", "amount": "1"}
            },
            "rgDescriptions": {
                "10_0": {"classid": "10", "instanceid": "0", "market_name": "Key"}
            }
        });
        let merged = merge_items_with_descriptions_from_inventory(&response, "2").unwrap();
        assert_eq!(merged["1001"]["market_name"], "Key");
        assert_eq!(merged["1001"]["contextid"], "2");
        assert_eq!(merged["1001"]["id"], "1001");
    }

    #[test]
    fn test_merge_offers() {
        let response = json!({
            "response": {
                "descriptions": [
                    {"classid": "10", "instanceid": "0", "market_name": "Key"}
                ],
                "trade_offers_received": [{
                    "tradeofferid": "42",
                    "items_to_give": [],
                    "items_to_receive": [
                        {"assetid": "1001", "classid": "10", "instanceid": "0",
                         "contextid": "2", "amount": "1"}
                    ]
                }],
                "trade_offers_sent": []
            }
        });
        let merged = merge_items_with_descriptions_from_offers(&response).unwrap();
        let offer = &merged["response"]["trade_offers_received"][0];
        assert_eq!(offer["items_to_receive"]["1001"]["market_name"], "Key");
    }

    #[test]
    fn test_listing_addresses_from_html() {
        let html = "CreateItemHoverFromContainer( g_rgAssets, 'mylisting_123_name', 570, '2', '999', 0 );";
        let addresses = get_listing_id_to_assets_address_from_html(html);
        assert_eq!(addresses["123"], json!(["570", "2", "999"]));
    }

    #[test]
    fn test_market_listings_from_html() {
        let html = r#"
            <div id="mylisting_123" class="market_listing_row">
                <span class="market_listing_price">$1.23</span>
                <span class="market_listing_item_name">Mann Co. Key</span>
            </div>
            <div id="mybuyorder_77" class="market_listing_row">
                <span class="market_listing_price">$0.50</span>
                <span class="market_listing_item_name">Case</span>
            </div>"#;
        let listings = get_market_listings_from_html(html).unwrap();
        assert_eq!(listings["sell_listings"]["123"]["item_name"], "Mann Co. Key");
        assert_eq!(listings["buy_orders"]["77"]["price"], "$0.50");
    }
}
