//! Protocol flows against the provider's endpoints.

pub mod client;
pub mod confirmation;
pub mod login;
pub mod models;
