//! Flip/momentum heuristic
//!
//! Looks at the recent margin history of a security to decide whether to
//! submit a fresh opportunity in its natural direction or inverted. The idea:
//! when margins have been oscillating in sign on a tight interval, a crowd of
//! arbitrageurs is ping-ponging the spread, so the profitable move is to bet
//! on the next reversal rather than take the current direction. Unverified as
//! a strategy; the exact search and window behaviour are kept reproducible.

use crate::arbitrage::history::MarginEntry;

/// Window within which two opposite-signed history entries count as a flip.
/// Compared directly against raw history timestamp deltas.
pub const FLIP_WINDOW: f64 = 0.2;

/// Pause before submitting an inverted opportunity (milliseconds).
pub const FLIP_DELAY_MS: u64 = 10;

/// Direction decision for a fresh opportunity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Submit buy-the-ask / sell-the-bid immediately.
    Natural,
    /// Swap the legs and submit after [`FLIP_DELAY_MS`].
    Flip,
}

/// Classify a fresh opportunity against the security's margin history.
///
/// The most recent entry (the one this opportunity just appended) is ignored.
/// Among the remaining entries, find the one whose absolute margin is
/// closest-but-still-below `current_margin`, favouring the later-indexed
/// entry on ties. If the entry immediately after it flipped sign within
/// [`FLIP_WINDOW`], the spread is oscillating and we invert.
pub fn classify(history: &[MarginEntry], current_margin: f64) -> Classification {
    if history.len() < 2 {
        return Classification::Natural;
    }

    let searchable = &history[..history.len() - 1];
    let mut best: Option<usize> = None;
    for (i, entry) in searchable.iter().enumerate() {
        if entry.margin.abs() >= current_margin {
            continue;
        }
        match best {
            Some(b) if searchable[b].margin.abs() > entry.margin.abs() => {}
            _ => best = Some(i),
        }
    }

    if let Some(i) = best {
        let found = &history[i];
        let next = &history[i + 1];
        let flipped_sign = (found.margin < 0.0) != (next.margin < 0.0);
        if flipped_sign && next.at_ms - found.at_ms < FLIP_WINDOW {
            return Classification::Flip;
        }
    }

    Classification::Natural
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(margin: f64, at_ms: f64) -> MarginEntry {
        MarginEntry { margin, at_ms }
    }

    #[test]
    fn oscillating_history_classifies_as_flip() {
        let history = vec![
            entry(2.0, 1_000.0),
            entry(1.0, 1_000.15),
            entry(-1.0, 1_000.16),
        ];
        assert_eq!(classify(&history, 1.5), Classification::Flip);
    }

    #[test]
    fn sign_flip_outside_the_window_is_natural() {
        let history = vec![
            entry(2.0, 1_000.0),
            entry(1.0, 1_000.0),
            entry(-1.0, 1_000.5),
        ];
        assert_eq!(classify(&history, 1.5), Classification::Natural);
    }

    #[test]
    fn same_sign_followup_is_natural() {
        let history = vec![
            entry(2.0, 1_000.0),
            entry(1.0, 1_000.15),
            entry(1.2, 1_000.16),
        ];
        assert_eq!(classify(&history, 1.5), Classification::Natural);
    }

    #[test]
    fn no_entry_below_the_current_margin_is_natural() {
        let history = vec![
            entry(3.0, 1_000.0),
            entry(-2.5, 1_000.1),
            entry(2.8, 1_000.2),
        ];
        assert_eq!(classify(&history, 1.5), Classification::Natural);
    }

    #[test]
    fn tie_break_favours_the_later_entry() {
        // Indices 0 and 1 tie at |margin| == 1.0. Index 0's follower flips
        // sign within the window, but the tie-break picks index 1, whose
        // follower keeps the sign, so the call is natural.
        let history = vec![
            entry(1.0, 1_000.0),
            entry(-1.0, 1_000.01),
            entry(-2.0, 1_000.02),
            entry(9.9, 1_000.3),
        ];
        assert_eq!(classify(&history, 1.5), Classification::Natural);
    }

    #[test]
    fn short_history_is_natural() {
        assert_eq!(classify(&[], 1.5), Classification::Natural);
        assert_eq!(classify(&[entry(1.0, 1_000.0)], 1.5), Classification::Natural);
    }
}
