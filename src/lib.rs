//! crossbook library
//!
//! Decision engine for a multi-venue trading simulation: cross-venue
//! arbitrage detection and sizing, tender evaluation against a
//! volatility-adjusted fair value, and rate-limited submission pacing.
//! The binary in `main.rs` wires these onto the simulator's REST API.

pub mod arbitrage;
pub mod book;
pub mod client;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod pacing;
pub mod quoter;
pub mod tender;
