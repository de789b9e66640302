//! Trading and market domain types.

use serde_json::{Value, json};

/// An app/context pair identifying a game's inventory namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameOptions {
    /// Steam application id, as a decimal string.
    pub app_id: String,
    /// Inventory context id within the app.
    pub context_id: String,
}

impl GameOptions {
    /// A custom app/context pair.
    pub fn new(app_id: impl Into<String>, context_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            context_id: context_id.into(),
        }
    }

    /// Dota 2 items.
    pub fn dota2() -> Self {
        Self::new("570", "2")
    }

    /// Counter-Strike items.
    pub fn cs() -> Self {
        Self::new("730", "2")
    }

    /// Team Fortress 2 items.
    pub fn tf2() -> Self {
        Self::new("440", "2")
    }

    /// Steam community items (cards, emoticons).
    pub fn steam() -> Self {
        Self::new("753", "6")
    }
}

/// Wallet currency codes accepted by the market endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Currency {
    /// US dollar.
    Usd = 1,
    /// Pound sterling.
    Gbp = 2,
    /// Euro.
    Euro = 3,
    /// Swiss franc.
    Chf = 4,
}

impl Currency {
    /// Numeric wire value.
    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

/// One inventory item referenced in a trade offer.
#[derive(Debug, Clone)]
pub struct Asset {
    /// The item's asset id within its context.
    pub asset_id: String,
    /// The game the item belongs to.
    pub game: GameOptions,
    /// Stack size; 1 for non-stackable items.
    pub amount: u32,
}

impl Asset {
    /// A single (amount 1) asset.
    pub fn new(asset_id: impl Into<String>, game: GameOptions) -> Self {
        Self {
            asset_id: asset_id.into(),
            game,
            amount: 1,
        }
    }

    /// Wire shape used inside the trade offer JSON.
    pub fn to_value(&self) -> Value {
        json!({
            "appid": self.game.app_id,
            "contextid": self.game.context_id,
            "amount": self.amount,
            "assetid": self.asset_id,
        })
    }
}

/// Lifecycle states of a trade offer, as reported by the Web API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeOfferState {
    /// Invalid offer.
    Invalid,
    /// Offer is open and actionable.
    Active,
    /// Offer was accepted.
    Accepted,
    /// Offer was countered.
    Countered,
    /// Offer expired.
    Expired,
    /// Offer was canceled by the sender.
    Canceled,
    /// Offer was declined by the recipient.
    Declined,
    /// Items in the offer are no longer available.
    InvalidItems,
    /// Offer awaits mobile confirmation.
    ConfirmationNeed,
    /// Offer was canceled through a secondary factor.
    CanceledBySecondaryFactor,
    /// Items are held in escrow.
    StateInEscrow,
}

impl TradeOfferState {
    /// Map the Web API's numeric state. Unknown values map to `Invalid`.
    pub fn from_u64(value: u64) -> Self {
        match value {
            2 => Self::Active,
            3 => Self::Accepted,
            4 => Self::Countered,
            5 => Self::Expired,
            6 => Self::Canceled,
            7 => Self::Declined,
            8 => Self::InvalidItems,
            9 => Self::ConfirmationNeed,
            10 => Self::CanceledBySecondaryFactor,
            11 => Self::StateInEscrow,
            _ => Self::Invalid,
        }
    }

    /// Numeric wire value.
    pub fn as_u64(self) -> u64 {
        match self {
            Self::Invalid => 1,
            Self::Active => 2,
            Self::Accepted => 3,
            Self::Countered => 4,
            Self::Expired => 5,
            Self::Canceled => 6,
            Self::Declined => 7,
            Self::InvalidItems => 8,
            Self::ConfirmationNeed => 9,
            Self::CanceledBySecondaryFactor => 10,
            Self::StateInEscrow => 11,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trade_offer_state_round_trip() {
        for raw in 1..=11 {
            let state = TradeOfferState::from_u64(raw);
            if state != TradeOfferState::Invalid || raw == 1 {
                assert_eq!(state.as_u64(), raw);
            }
        }
        assert_eq!(TradeOfferState::from_u64(99), TradeOfferState::Invalid);
    }

    #[test]
    fn test_asset_wire_shape() {
        let asset = Asset::new("12345", GameOptions::tf2());
        let value = asset.to_value();
        assert_eq!(value["appid"], "440");
        assert_eq!(value["contextid"], "2");
        assert_eq!(value["assetid"], "12345");
        assert_eq!(value["amount"], 1);
    }
}
