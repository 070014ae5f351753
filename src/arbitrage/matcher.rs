//! Arbitrage matcher
//!
//! Walks each security's merged bid/ask ladders and greedily matches crossed
//! quantity between venues, producing at most one opportunity record per
//! security per evaluation cycle. All consumption happens on a private copy
//! of the ladders; the caller's snapshot is never touched.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::arbitrage::history::MarginHistory;
use crate::book::Book;

/// One cycle's crossed quantity for a security.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opportunity {
    pub security: String,
    /// Total quantity profitably tradable between the two venues.
    pub amount: i64,
    /// Best bid minus best ask at discovery. Locked in on the first crossing
    /// iteration; later fills in the same walk do not update it.
    pub margin: f64,
    /// Venue supplying the ask leg. Reflects only the final crossing
    /// iteration of a multi-order match.
    pub ask_venue: String,
    /// Venue supplying the bid leg, same caveat as `ask_venue`.
    pub bid_venue: String,
}

/// Scan every security in `book` for crossed quantity.
///
/// Each nonzero-amount opportunity appends exactly one entry to `history`,
/// with the margin sign flipped when the crossing ask came from
/// `alternate_venue` (the margin is recorded relative to the main venue).
pub fn find_opportunities(
    book: &Book,
    history: &mut MarginHistory,
    alternate_venue: &str,
    now_ms: f64,
) -> Vec<Opportunity> {
    let mut found = Vec::new();

    for (security, security_book) in book.iter() {
        let mut bids = security_book.bids.clone();
        let mut asks = security_book.asks.clone();

        let mut margin = 0.0;
        let mut margin_locked = false;
        let mut amount: i64 = 0;
        let mut ask_venue = String::new();
        let mut bid_venue = String::new();

        loop {
            let (ask_price, ask_qty) = match asks.first() {
                Some(ask) => (ask.price, ask.quantity),
                None => break,
            };
            let (bid_price, bid_qty) = match bids.first() {
                Some(bid) => (bid.price, bid.quantity),
                None => break,
            };
            if ask_price >= bid_price {
                break;
            }

            if !margin_locked {
                margin = bid_price - ask_price;
                margin_locked = true;
            }

            let fill = ask_qty.min(bid_qty);
            amount += fill;
            ask_venue.clone_from(&asks[0].venue);
            bid_venue.clone_from(&bids[0].venue);

            // Shrink the larger side by the fill; drop whichever orders are
            // fully consumed. Equal sizes consume both.
            if ask_qty < bid_qty {
                bids[0].quantity -= fill;
                asks.remove(0);
            } else if bid_qty < ask_qty {
                asks[0].quantity -= fill;
                bids.remove(0);
            } else {
                asks.remove(0);
                bids.remove(0);
            }
        }

        if amount > 0 {
            let signed = if ask_venue == alternate_venue {
                -margin
            } else {
                margin
            };
            history.record(security, signed, now_ms);
            debug!(
                security = security.as_str(),
                amount,
                margin,
                ask_venue = ask_venue.as_str(),
                bid_venue = bid_venue.as_str(),
                "crossed quantity found"
            );
            found.push(Opportunity {
                security: security.clone(),
                amount,
                margin,
                ask_venue,
                bid_venue,
            });
        }
    }

    found
}
