//! Arbitrage Detection Module
//! Mission: Identify and quantify cross-venue price mismatches
//! Philosophy: Profit is in the spread, execution is in the speed

pub mod flip;
pub mod history;
pub mod matcher;

pub use flip::{classify, Classification};
pub use history::{MarginEntry, MarginHistory};
pub use matcher::{find_opportunities, Opportunity};
