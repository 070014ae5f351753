//! Simulator REST transport
//!
//! Thin client for the trading-case API: book/portfolio/tender snapshots in,
//! orders and tender decisions out. No decision logic lives here. Rate-limit
//! responses are retried with a bounded backoff loop, never recursively,
//! and auth failures surface immediately with context.

use anyhow::{bail, Context, Result};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::book::{join_venue_suffix, merge_ladder, split_venue_suffix, Book, Order, SecurityBook, Side};
use crate::config::Config;
use crate::tender::{Action, Portfolio, Tender};

/// Maximum attempts for one request before giving up.
const MAX_ATTEMPTS: u32 = 5;

/// Fallback wait when a rate-limit response carries no Retry-After header.
const DEFAULT_RETRY_AFTER_SECS: f64 = 1.0;

/// Order type accepted by the venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderType {
    Market,
    Limit,
}

impl OrderType {
    fn as_str(&self) -> &'static str {
        match self {
            OrderType::Market => "MARKET",
            OrderType::Limit => "LIMIT",
        }
    }
}

#[derive(Debug, Deserialize)]
struct CasePayload {
    tick: u32,
}

#[derive(Debug, Deserialize)]
struct SecurityPayload {
    ticker: String,
    position: i64,
}

#[derive(Debug, Deserialize)]
struct BookPayload {
    #[serde(default)]
    bids: Vec<OrderPayload>,
    #[serde(default)]
    asks: Vec<OrderPayload>,
}

#[derive(Debug, Deserialize)]
struct OrderPayload {
    ticker: String,
    price: f64,
    quantity: i64,
    #[serde(default)]
    quantity_filled: i64,
    #[serde(default)]
    trader_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TenderPayload {
    tender_id: i64,
    ticker: String,
    action: Action,
    quantity: i64,
    #[serde(default)]
    price: Option<f64>,
    #[serde(default)]
    is_fixed_bid: bool,
    #[serde(default)]
    caption: String,
}

#[derive(Debug, Deserialize)]
struct HistoryPayload {
    close: f64,
}

/// REST client bound to one trading session.
pub struct SimClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl SimClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    /// Current tick of the running case.
    pub async fn get_tick(&self) -> Result<u32> {
        let case: CasePayload = self.get_json("case", &[]).await?;
        Ok(case.tick)
    }

    /// Positions per base security.
    pub async fn get_portfolio(&self, config: &Config) -> Result<Portfolio> {
        let securities: Vec<SecurityPayload> = self.get_json("securities", &[]).await?;
        let mut portfolio = Portfolio::new();
        for sec in securities {
            let (base, _) =
                split_venue_suffix(&sec.ticker, config.multi_venue(), &config.main_venue);
            // Venue-suffixed listings of the same underlying report the same
            // net position; the last one wins.
            portfolio.set(base, sec.position);
        }
        Ok(portfolio)
    }

    /// Merged books for every configured security, optionally fee-adjusted.
    pub async fn get_books(&self, config: &Config, with_fees: bool) -> Result<Book> {
        let fees = config.venue_fees();
        let fee_table = with_fees.then_some(&fees);
        let mut book = Book::new();

        for security in &config.securities {
            let mut bids: Vec<Order> = Vec::new();
            let mut asks: Vec<Order> = Vec::new();

            for venue in &config.venues {
                let ticker =
                    join_venue_suffix(&security.ticker, &venue.id, config.multi_venue());
                let payload: BookPayload = self
                    .get_json("securities/book", &[("ticker", ticker.as_str())])
                    .await
                    .with_context(|| format!("fetching book for {ticker}"))?;
                bids.extend(payload.bids.into_iter().map(|o| decode_order(o, config)));
                asks.extend(payload.asks.into_iter().map(|o| decode_order(o, config)));
            }

            book.insert(
                security.ticker.clone(),
                SecurityBook {
                    bids: merge_ladder(bids, Side::Bid, fee_table),
                    asks: merge_ladder(asks, Side::Ask, fee_table),
                },
            );
        }
        Ok(book)
    }

    /// Outstanding tender offers.
    pub async fn get_tenders(&self, config: &Config) -> Result<Vec<Tender>> {
        let payloads: Vec<TenderPayload> = self.get_json("tenders", &[]).await?;
        Ok(payloads
            .into_iter()
            .map(|t| {
                let (base, _) =
                    split_venue_suffix(&t.ticker, config.multi_venue(), &config.main_venue);
                Tender {
                    id: t.tender_id,
                    security: base,
                    action: t.action,
                    quantity: t.quantity,
                    price: t.price.unwrap_or(0.0),
                    fixed_bid: t.is_fixed_bid,
                    caption: t.caption,
                }
            })
            .collect())
    }

    /// Recent close prices for `ticker`, newest first.
    pub async fn get_recent_closes(&self, ticker: &str, limit: usize) -> Result<Vec<f64>> {
        let limit = limit.to_string();
        let ticks: Vec<HistoryPayload> = self
            .get_json(
                "securities/history",
                &[("ticker", ticker), ("limit", limit.as_str())],
            )
            .await?;
        Ok(ticks.into_iter().map(|t| t.close).collect())
    }

    /// Submit one order. Returns whether the venue acknowledged it.
    pub async fn submit_order(
        &self,
        ticker: &str,
        order_type: OrderType,
        quantity: i64,
        action: Action,
        price: Option<f64>,
    ) -> Result<bool> {
        let quantity = quantity.to_string();
        let mut params: Vec<(&str, String)> = vec![
            ("ticker", ticker.to_string()),
            ("type", order_type.as_str().to_string()),
            ("quantity", quantity),
            ("action", action.as_str().to_string()),
        ];
        if let Some(price) = price {
            params.push(("price", price.to_string()));
        }

        let status = self
            .post_with_retry("orders", &params)
            .await
            .with_context(|| format!("submitting {} {ticker}", action.as_str()))?;
        Ok(status == StatusCode::OK)
    }

    pub async fn accept_tender(&self, tender_id: i64) -> Result<()> {
        let path = format!("tenders/{tender_id}");
        self.post_with_retry(&path, &[]).await?;
        debug!(tender_id, "tender accepted");
        Ok(())
    }

    pub async fn reject_tender(&self, tender_id: i64) -> Result<()> {
        let url = format!("{}/tenders/{tender_id}", self.base_url);
        let response = self
            .http
            .delete(&url)
            .header("X-API-Key", &self.api_key)
            .send()
            .await
            .context("rejecting tender")?;
        debug!(tender_id, status = %response.status(), "tender rejected");
        Ok(())
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let url = format!("{}/{path}", self.base_url);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let response = self
                .http
                .get(&url)
                .query(query)
                .header("X-API-Key", &self.api_key)
                .send()
                .await
                .with_context(|| format!("GET {path}"))?;

            match response.status() {
                StatusCode::OK => return Ok(response.json().await.with_context(|| {
                    format!("decoding response from {path}")
                })?),
                StatusCode::UNAUTHORIZED => {
                    bail!("API key rejected by the venue; check CROSSBOOK_API_KEY")
                }
                status => {
                    if attempt >= MAX_ATTEMPTS {
                        bail!("GET {path} failed with {status} after {attempt} attempts");
                    }
                    let wait = retry_after_secs(&response);
                    warn!(path, %status, attempt, wait, "retrying request");
                    tokio::time::sleep(Duration::from_secs_f64(wait)).await;
                }
            }
        }
    }

    async fn post_with_retry(&self, path: &str, params: &[(&str, String)]) -> Result<StatusCode> {
        let url = format!("{}/{path}", self.base_url);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let response = self
                .http
                .post(&url)
                .query(params)
                .header("X-API-Key", &self.api_key)
                .send()
                .await
                .with_context(|| format!("POST {path}"))?;

            match response.status() {
                StatusCode::TOO_MANY_REQUESTS if attempt < MAX_ATTEMPTS => {
                    let wait = retry_after_secs(&response);
                    warn!(path, attempt, wait, "rate limited, backing off");
                    tokio::time::sleep(Duration::from_secs_f64(wait)).await;
                }
                StatusCode::UNAUTHORIZED => {
                    bail!("API key rejected by the venue; check CROSSBOOK_API_KEY")
                }
                status => return Ok(status),
            }
        }
    }
}

fn decode_order(payload: OrderPayload, config: &Config) -> Order {
    let (base, venue) =
        split_venue_suffix(&payload.ticker, config.multi_venue(), &config.main_venue);
    Order {
        security: base,
        venue,
        price: payload.price,
        quantity: payload.quantity - payload.quantity_filled,
        trader: payload.trader_id,
    }
}

fn retry_after_secs(response: &reqwest::Response) -> f64 {
    response
        .headers()
        .get("Retry-After")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
}
