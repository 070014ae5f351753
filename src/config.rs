//! Run configuration
//!
//! Everything the decision engine treats as a constant for the life of a
//! trading session: the security universe, venue fee schedule, position and
//! order limits, and session timing. Loaded once from the environment at
//! startup, in the same spirit as the simulator's own case parameters.

use std::collections::HashMap;
use std::env;

/// One tradeable underlying security and its case parameters.
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// Base ticker without any venue suffix (e.g. "CRZY").
    pub ticker: String,
    /// Per-session price volatility used by the tender evaluator.
    pub volatility: f64,
    /// Opening price, used as the fair-value fallback before the first tick.
    pub start_price: f64,
}

/// One trading venue and its taker fee per unit.
#[derive(Debug, Clone)]
pub struct VenueConfig {
    /// Single-letter venue suffix (e.g. "M" or "A").
    pub id: String,
    /// Cost per unit charged for taking liquidity on this venue.
    pub fee: f64,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub base_url: String,
    pub securities: Vec<SecurityConfig>,
    pub venues: Vec<VenueConfig>,
    /// Venue treated as the reference when signing margin history entries.
    pub main_venue: String,
    /// The non-reference venue; opportunities whose final ask came from here
    /// are recorded with a flipped margin sign.
    pub alternate_venue: String,
    /// Maximum absolute position per security.
    pub per_security_limit: i64,
    /// Maximum sum of absolute positions across all securities.
    pub gross_limit: i64,
    /// Maximum quantity per submitted order.
    pub order_size_limit: i64,
    /// Maximum order submissions per second allowed by the venue.
    pub order_rate: f64,
    /// Minimum delay between submissions (seconds).
    pub min_order_delay: f64,
    /// Total ticks in the session.
    pub total_ticks: u32,
    /// Simulation ticks that elapse per real-time second.
    pub ticks_per_second: f64,
    /// Flat fee per unit applied when bounding tender fair value.
    pub tender_fee: f64,
    /// Whether the feed anonymizes trader tags on book orders.
    pub anonymized: bool,
    /// Our own trader tag, when the feed carries tags.
    pub trader_id: String,
    /// Order sizes this bot submits; under anonymization, book orders of
    /// these exact sizes are assumed to be our own.
    pub bot_order_sizes: Vec<i64>,
    /// Poll interval of the outer decision loop (milliseconds).
    pub poll_interval_ms: u64,
    /// Enable the supplementary passive quoting loop.
    pub quoter_enabled: bool,
    /// Fixed price offset for quoter bid/ask pairs.
    pub quoter_spread: f64,
    /// Volume per quoter order (each side).
    pub quoter_volume: i64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let api_key = env::var("CROSSBOOK_API_KEY").unwrap_or_else(|_| "changeme".to_string());
        let base_url = env::var("CROSSBOOK_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:9999/v1".to_string());

        // "CRZY:12.0:10.0,TAME:8.0:25.0" => ticker:volatility:start_price
        let securities = env::var("CROSSBOOK_SECURITIES")
            .unwrap_or_else(|_| "CRZY:12.0:10.0,TAME:8.0:25.0".to_string())
            .split(',')
            .filter_map(parse_security)
            .collect::<Vec<_>>();

        // "M:0.00,A:0.02" => venue:fee
        let venues = env::var("CROSSBOOK_VENUES")
            .unwrap_or_else(|_| "M:0.00,A:0.02".to_string())
            .split(',')
            .filter_map(parse_venue)
            .collect::<Vec<_>>();

        let main_venue = env::var("CROSSBOOK_MAIN_VENUE").unwrap_or_else(|_| "M".to_string());
        let alternate_venue =
            env::var("CROSSBOOK_ALTERNATE_VENUE").unwrap_or_else(|_| "A".to_string());

        let bot_order_sizes = env::var("CROSSBOOK_BOT_ORDER_SIZES")
            .unwrap_or_else(|_| "1000".to_string())
            .split(',')
            .filter_map(|s| s.trim().parse::<i64>().ok())
            .collect::<Vec<_>>();

        Ok(Self {
            api_key,
            base_url,
            securities,
            venues,
            main_venue,
            alternate_venue,
            per_security_limit: parse_env("CROSSBOOK_POSITION_LIMIT", 25_000),
            gross_limit: parse_env("CROSSBOOK_GROSS_LIMIT", 100_000),
            order_size_limit: parse_env("CROSSBOOK_ORDER_SIZE_LIMIT", 10_000),
            order_rate: parse_env("CROSSBOOK_ORDER_RATE", 10.0),
            min_order_delay: parse_env("CROSSBOOK_MIN_ORDER_DELAY", 0.01),
            total_ticks: parse_env("CROSSBOOK_TOTAL_TICKS", 300u32),
            ticks_per_second: parse_env("CROSSBOOK_TICKS_PER_SECOND", 1.0),
            tender_fee: parse_env("CROSSBOOK_TENDER_FEE", 0.02),
            anonymized: parse_env_bool("CROSSBOOK_ANONYMIZED", false),
            trader_id: env::var("CROSSBOOK_TRADER_ID").unwrap_or_else(|_| "BOT".to_string()),
            bot_order_sizes,
            poll_interval_ms: parse_env("CROSSBOOK_POLL_INTERVAL_MS", 250u64),
            quoter_enabled: parse_env_bool("CROSSBOOK_QUOTER_ENABLED", false),
            quoter_spread: parse_env("CROSSBOOK_QUOTER_SPREAD", 0.15),
            quoter_volume: parse_env("CROSSBOOK_QUOTER_VOLUME", 1_000),
        })
    }

    /// True when the case trades the same underlying on more than one venue.
    pub fn multi_venue(&self) -> bool {
        self.venues.len() > 1
    }

    /// Venue id -> taker fee lookup.
    pub fn venue_fees(&self) -> HashMap<String, f64> {
        self.venues
            .iter()
            .map(|v| (v.id.clone(), v.fee))
            .collect()
    }

    pub fn security(&self, ticker: &str) -> Option<&SecurityConfig> {
        self.securities.iter().find(|s| s.ticker == ticker)
    }
}

fn parse_security(raw: &str) -> Option<SecurityConfig> {
    let mut parts = raw.trim().split(':');
    let ticker = parts.next()?.to_string();
    if ticker.is_empty() {
        return None;
    }
    let volatility = parts.next().and_then(|v| v.parse().ok()).unwrap_or(10.0);
    let start_price = parts.next().and_then(|v| v.parse().ok()).unwrap_or(10.0);
    Some(SecurityConfig {
        ticker,
        volatility,
        start_price,
    })
}

fn parse_venue(raw: &str) -> Option<VenueConfig> {
    let mut parts = raw.trim().split(':');
    let id = parts.next()?.to_string();
    if id.is_empty() {
        return None;
    }
    let fee = parts.next().and_then(|v| v.parse().ok()).unwrap_or(0.0);
    Some(VenueConfig { id, fee })
}

fn parse_env<T: std::str::FromStr>(var: &str, default: T) -> T {
    env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_bool(var: &str, default: bool) -> bool {
    env::var(var)
        .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "on" | "ON"))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn security_entry_parses_with_defaults() {
        let sec = parse_security("CRZY:12.5:9.75").unwrap();
        assert_eq!(sec.ticker, "CRZY");
        assert!((sec.volatility - 12.5).abs() < 1e-9);
        assert!((sec.start_price - 9.75).abs() < 1e-9);

        let bare = parse_security("TAME").unwrap();
        assert_eq!(bare.ticker, "TAME");
        assert!((bare.volatility - 10.0).abs() < 1e-9);
    }

    #[test]
    fn venue_entry_parses() {
        let venue = parse_venue("A:0.02").unwrap();
        assert_eq!(venue.id, "A");
        assert!((venue.fee - 0.02).abs() < 1e-9);
        assert!(parse_venue("").is_none());
    }
}
