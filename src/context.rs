//! Evaluation context
//!
//! Session-scoped mutable state the decision pipeline is allowed to touch:
//! the margin history feeding the flip heuristic, and local bookkeeping of
//! positions implied by our own submissions. Owned by the single evaluation
//! loop and passed by reference into each cycle, so every side effect on it
//! is explicit.

use crate::arbitrage::MarginHistory;
use crate::tender::Portfolio;

/// Mutable state carried across evaluation cycles of one trading session.
#[derive(Debug, Clone, Default)]
pub struct EvaluationContext {
    /// Per-security arbitrage margin time series.
    pub history: MarginHistory,
    /// Positions implied by fills we have submitted this session. Advisory
    /// only; the venue's portfolio snapshot remains the source of truth.
    pub local_positions: Portfolio,
}

impl EvaluationContext {
    pub fn new() -> Self {
        Self::default()
    }
}
