//! Domain models shared across the client.

pub mod error;
pub mod trade;

pub use error::{Error, Result};
pub use trade::{Asset, Currency, GameOptions, TradeOfferState};
