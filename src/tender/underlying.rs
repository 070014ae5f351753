//! Underlying fair-price estimation
//!
//! The book is full of our own resting quotes, so a naive best-of-book read
//! feeds our own prices back into our valuation. This estimator prefers the
//! best orders identifiably placed by somebody else: by trader tag when the
//! feed carries tags, or by excluding our canonical order sizes when every
//! participant is anonymized.

use crate::book::{Order, SecurityBook};
use crate::config::SecurityConfig;

/// Filtering mode for recognising our own orders in the book.
#[derive(Debug, Clone)]
pub enum OwnOrderFilter {
    /// The feed carries trader tags; ours is this one.
    Tagged { trader_id: String },
    /// The feed anonymizes tags; orders of exactly these sizes are presumed
    /// ours.
    Anonymized { bot_order_sizes: Vec<i64> },
}

impl OwnOrderFilter {
    fn is_ours(&self, order: &Order) -> bool {
        match self {
            OwnOrderFilter::Tagged { trader_id } => {
                order.trader.as_deref() == Some(trader_id.as_str())
            }
            OwnOrderFilter::Anonymized { bot_order_sizes } => {
                bot_order_sizes.contains(&order.quantity)
            }
        }
    }
}

/// Estimate the underlying fair price of one security from its merged book.
///
/// Midpoint of the best non-own bid and ask when both exist, degrading to
/// whichever side does, then to the raw best of book, then to the configured
/// start price. Before the first tick there is no information in the book at
/// all, so the start price wins outright.
pub fn estimate_underlying(
    book: &SecurityBook,
    tick: u32,
    security: &SecurityConfig,
    filter: &OwnOrderFilter,
) -> f64 {
    if tick == 0 {
        return security.start_price;
    }

    let bid = book.bids.iter().find(|o| !filter.is_ours(o));
    let ask = book.asks.iter().find(|o| !filter.is_ours(o));

    match (bid, ask) {
        (Some(b), Some(a)) => (b.price + a.price) / 2.0,
        (Some(b), None) => b.price,
        (None, Some(a)) => a.price,
        (None, None) => match (book.best_bid(), book.best_ask()) {
            (Some(b), Some(a)) => (b.price + a.price) / 2.0,
            (Some(b), None) => b.price,
            (None, Some(a)) => a.price,
            (None, None) => security.start_price,
        },
    }
}
