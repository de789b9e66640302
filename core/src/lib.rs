//! Core SteamGuard primitives used by steamrs clients.
//!
//! This crate is pure logic: it loads an account's guard secrets and derives
//! the time-based values the Steam web endpoints expect. It performs no
//! network I/O; the HTTP client lives in the `steamrs` crate.

pub mod guard;

pub use guard::{GuardError, GuardSecrets, Result};
