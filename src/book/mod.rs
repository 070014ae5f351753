//! Order book model
//!
//! Normalized bid/ask ladders per security, merged across venues. Two
//! variants of the same snapshot exist side by side: the raw book and a
//! fee-adjusted book where every price has been moved against the taker by
//! that order's venue fee. Both are built independently from the same
//! per-venue payloads so neither can contaminate the other.

pub mod vwap;

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::error::EngineError;

/// Which side of the book a ladder belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Bid,
    Ask,
}

/// A resting order as the decision engine sees it: remaining quantity only,
/// venue split off the raw ticker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Base ticker, no venue suffix.
    pub security: String,
    pub venue: String,
    pub price: f64,
    /// Remaining (unfilled) quantity. Never negative after any walk.
    pub quantity: i64,
    /// Trader tag, absent when the feed anonymizes participants.
    pub trader: Option<String>,
}

/// Both ladders of one security, best price first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecurityBook {
    pub bids: Vec<Order>,
    pub asks: Vec<Order>,
}

impl SecurityBook {
    pub fn best_bid(&self) -> Option<&Order> {
        self.bids.first()
    }

    pub fn best_ask(&self) -> Option<&Order> {
        self.asks.first()
    }
}

/// Snapshot of every security's merged book for one evaluation cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Book {
    securities: HashMap<String, SecurityBook>,
}

impl Book {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, security: impl Into<String>, book: SecurityBook) {
        self.securities.insert(security.into(), book);
    }

    pub fn get(&self, security: &str) -> Result<&SecurityBook, EngineError> {
        self.securities
            .get(security)
            .ok_or_else(|| EngineError::UnknownSecurity(security.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SecurityBook)> {
        self.securities.iter()
    }

    pub fn len(&self) -> usize {
        self.securities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.securities.is_empty()
    }
}

/// Merge per-venue orders for one side of one security into a single ladder.
///
/// When `fees` is given, each price is moved against the taker: bids are
/// worth less to hit by the venue fee, asks cost more to lift. The sort is
/// stable so same-priced orders keep their venue arrival order.
pub fn merge_ladder(
    mut orders: Vec<Order>,
    side: Side,
    fees: Option<&HashMap<String, f64>>,
) -> Vec<Order> {
    if let Some(fees) = fees {
        for order in &mut orders {
            let fee = fees.get(&order.venue).copied().unwrap_or(0.0);
            match side {
                Side::Bid => order.price -= fee,
                Side::Ask => order.price += fee,
            }
        }
    }
    match side {
        Side::Bid => orders.sort_by(|a, b| cmp_price(b.price, a.price)),
        Side::Ask => orders.sort_by(|a, b| cmp_price(a.price, b.price)),
    }
    orders
}

fn cmp_price(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Split a raw ticker into `(base, venue)`.
///
/// Multi-venue cases suffix the venue onto the base ticker ("CRZY_A"); single
/// venue cases use the bare ticker, and everything trades on `main_venue`.
pub fn split_venue_suffix(ticker: &str, multi_venue: bool, main_venue: &str) -> (String, String) {
    if multi_venue {
        if let Some((base, venue)) = ticker.rsplit_once('_') {
            return (base.to_string(), venue.to_string());
        }
    }
    (ticker.to_string(), main_venue.to_string())
}

/// Inverse of [`split_venue_suffix`].
pub fn join_venue_suffix(base: &str, venue: &str, multi_venue: bool) -> String {
    if multi_venue {
        format!("{base}_{venue}")
    } else {
        base.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(venue: &str, price: f64, quantity: i64) -> Order {
        Order {
            security: "CRZY".to_string(),
            venue: venue.to_string(),
            price,
            quantity,
            trader: None,
        }
    }

    fn fee_table() -> HashMap<String, f64> {
        HashMap::from([("M".to_string(), 0.00), ("A".to_string(), 0.02)])
    }

    #[test]
    fn bids_sort_descending_asks_ascending() {
        let bids = merge_ladder(
            vec![order("M", 9.98, 100), order("A", 10.01, 50), order("M", 10.00, 200)],
            Side::Bid,
            None,
        );
        let prices: Vec<f64> = bids.iter().map(|o| o.price).collect();
        assert_eq!(prices, vec![10.01, 10.00, 9.98]);

        let asks = merge_ladder(
            vec![order("A", 10.05, 100), order("M", 10.02, 50)],
            Side::Ask,
            None,
        );
        let prices: Vec<f64> = asks.iter().map(|o| o.price).collect();
        assert_eq!(prices, vec![10.02, 10.05]);
    }

    #[test]
    fn stable_sort_preserves_arrival_order_on_ties() {
        let bids = merge_ladder(
            vec![order("M", 10.00, 100), order("A", 10.00, 50)],
            Side::Bid,
            None,
        );
        assert_eq!(bids[0].venue, "M");
        assert_eq!(bids[1].venue, "A");
    }

    #[test]
    fn fees_move_prices_against_the_taker() {
        let fees = fee_table();
        let bids = merge_ladder(vec![order("A", 10.00, 100)], Side::Bid, Some(&fees));
        assert!((bids[0].price - 9.98).abs() < 1e-9);

        let asks = merge_ladder(vec![order("A", 10.00, 100)], Side::Ask, Some(&fees));
        assert!((asks[0].price - 10.02).abs() < 1e-9);

        // Zero-fee venue is untouched either way.
        let asks = merge_ladder(vec![order("M", 10.00, 100)], Side::Ask, Some(&fees));
        assert!((asks[0].price - 10.00).abs() < 1e-9);
    }

    #[test]
    fn venue_suffix_round_trips() {
        assert_eq!(
            split_venue_suffix("CRZY_A", true, "M"),
            ("CRZY".to_string(), "A".to_string())
        );
        assert_eq!(join_venue_suffix("CRZY", "A", true), "CRZY_A");

        // Single-venue mode: bare ticker, fixed default venue.
        assert_eq!(
            split_venue_suffix("CRZY", false, "M"),
            ("CRZY".to_string(), "M".to_string())
        );
        assert_eq!(join_venue_suffix("CRZY", "A", false), "CRZY");
    }

    #[test]
    fn unknown_security_is_an_explicit_error() {
        let book = Book::new();
        assert!(matches!(
            book.get("GHOST"),
            Err(crate::error::EngineError::UnknownSecurity(_))
        ));
    }
}
