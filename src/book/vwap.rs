//! VWAP walker
//!
//! Computes the volume-weighted average price obtainable for a target
//! quantity against a price-ordered ladder. The walk is read-only: depth is
//! consumed on a running tally, never on the caller's orders.

use crate::book::Order;

/// Volume-weighted average price for `quantity` units against `ladder`.
///
/// The ladder must already be sorted best price first. Whole orders are
/// consumed front to back, with the final order consumed partially if the
/// target lands inside it. Returns `None` when the ladder runs out of depth
/// before the target is filled, and for a target of zero; callers must
/// treat `None` as "unknown / unfavorable", never as a price of zero.
pub fn vwap(quantity: i64, ladder: &[Order]) -> Option<f64> {
    if quantity <= 0 {
        return None;
    }

    let mut remaining = quantity;
    let mut notional = 0.0;

    for order in ladder {
        if order.quantity >= remaining {
            notional += order.price * remaining as f64;
            remaining = 0;
            break;
        }
        notional += order.price * order.quantity as f64;
        remaining -= order.quantity;
    }

    if remaining > 0 {
        return None;
    }
    Some(notional / quantity as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(price: f64, quantity: i64) -> Order {
        Order {
            security: "CRZY".to_string(),
            venue: "M".to_string(),
            price,
            quantity,
            trader: None,
        }
    }

    #[test]
    fn exact_depth_gives_true_weighted_average() {
        let ladder = vec![order(10.00, 100), order(10.10, 300)];
        let got = vwap(400, &ladder).unwrap();
        let want = (10.00 * 100.0 + 10.10 * 300.0) / 400.0;
        assert!((got - want).abs() < 1e-9);
    }

    #[test]
    fn partial_final_order() {
        let ladder = vec![order(10.00, 100), order(10.50, 1_000)];
        let got = vwap(150, &ladder).unwrap();
        let want = (10.00 * 100.0 + 10.50 * 50.0) / 150.0;
        assert!((got - want).abs() < 1e-9);
    }

    #[test]
    fn insufficient_depth_is_the_sentinel() {
        let ladder = vec![order(10.00, 100)];
        assert_eq!(vwap(101, &ladder), None);
        assert_eq!(vwap(1, &[]), None);
    }

    #[test]
    fn zero_quantity_is_the_sentinel_not_an_error() {
        let ladder = vec![order(10.00, 100)];
        assert_eq!(vwap(0, &ladder), None);
    }

    #[test]
    fn walk_does_not_mutate_the_ladder() {
        let ladder = vec![order(10.00, 100), order(10.10, 300)];
        let before: Vec<i64> = ladder.iter().map(|o| o.quantity).collect();
        let _ = vwap(250, &ladder);
        let after: Vec<i64> = ladder.iter().map(|o| o.quantity).collect();
        assert_eq!(before, after);
    }
}
