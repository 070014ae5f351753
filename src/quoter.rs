//! Passive quoter
//!
//! Supplementary strategy: keep a paired LIMIT buy/sell around the average of
//! recent closes at a fixed offset, skipping any security where the pair
//! would push the position past its limit. Submission is paced by its own
//! speed-bump window. Disabled unless configured on.

use anyhow::Result;
use std::time::Instant;
use tracing::{debug, warn};

use crate::book::join_venue_suffix;
use crate::client::{OrderType, SimClient};
use crate::config::Config;
use crate::pacing::SpeedBump;
use crate::tender::{Action, Portfolio};

/// Closes averaged for the quote midpoint.
const CLOSE_WINDOW: usize = 10;

pub struct Quoter {
    pacer: SpeedBump,
}

impl Quoter {
    pub fn new(config: &Config) -> Self {
        Self {
            pacer: SpeedBump::new(config.order_rate, config.min_order_delay),
        }
    }

    pub async fn run_cycle(
        &mut self,
        client: &SimClient,
        config: &Config,
        portfolio: &Portfolio,
    ) -> Result<()> {
        for security in &config.securities {
            let position = portfolio.position(&security.ticker);
            // Either fill alone may stick; leave room for the full pair.
            if position.abs() + config.quoter_volume > config.per_security_limit {
                debug!(
                    security = security.ticker.as_str(),
                    position, "skipping quotes, position limit headroom exhausted"
                );
                continue;
            }

            let ticker =
                join_venue_suffix(&security.ticker, &config.main_venue, config.multi_venue());
            let closes = client.get_recent_closes(&ticker, CLOSE_WINDOW).await?;
            if closes.is_empty() {
                continue;
            }
            let reference = closes.iter().sum::<f64>() / closes.len() as f64;

            let started = Instant::now();
            let buy_ok = client
                .submit_order(
                    &ticker,
                    OrderType::Limit,
                    config.quoter_volume,
                    Action::Buy,
                    Some(reference - config.quoter_spread),
                )
                .await?;
            let sell_ok = client
                .submit_order(
                    &ticker,
                    OrderType::Limit,
                    config.quoter_volume,
                    Action::Sell,
                    Some(reference + config.quoter_spread),
                )
                .await?;
            self.pacer.record(started.elapsed().as_secs_f64());

            if !(buy_ok && sell_ok) {
                warn!(
                    security = security.ticker.as_str(),
                    buy_ok, sell_ok, "quote pair not fully acknowledged"
                );
            }

            tokio::time::sleep(self.pacer.required_delay()).await;
        }
        Ok(())
    }
}
