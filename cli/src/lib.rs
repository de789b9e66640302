//! Rust client for Steam web login, trading and mobile confirmations.
//!
//! The crate authenticates against the web login (RSA-encrypted password
//! submission with SteamGuard two-factor), keeps the resulting cookie session
//! normalized across the store and community origins, and resolves/approves
//! pending mobile confirmations for trade offers and market listings. The
//! pure SteamGuard derivations live in `steamrs-core`.
//!
//! ## Quick Start
//!
//! ```ignore
//! let mut client = SteamClient::new(Some(api_key))?;
//! client.login(&username, &password, &guard_file).await?;
//! let offers = client.get_trade_offers(true).await?;
//! client.confirm_trade_offer(&offer_id).await?;
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod market;
pub mod models;
pub mod scrape;
pub mod trade;

pub use api::client::SteamUrls;
pub use api::confirmation::{
    ConfirmationAction, ConfirmationFlow, ConfirmationResult, ConfirmationTarget,
};
pub use client::SteamClient;
pub use config::Config;
pub use market::Market;
pub use models::{Asset, Currency, Error, GameOptions, Result, TradeOfferState};
pub use trade::TradeHistoryOptions;
