//! Decision engine
//!
//! One evaluation cycle: pull the tick, merged books (raw and fee-adjusted),
//! portfolio, and open tenders; answer every tender; then find crossed
//! quantity across venues and submit both legs, inverted when the flip
//! heuristic says the spread is oscillating. All blocking I/O lives in the
//! transport client; everything here consumes immutable snapshots plus the
//! explicit [`EvaluationContext`].

use anyhow::Result;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::arbitrage::{classify, find_opportunities, flip, Classification, Opportunity};
use crate::book::join_venue_suffix;
use crate::client::{OrderType, SimClient};
use crate::config::Config;
use crate::context::EvaluationContext;
use crate::pacing::SpeedBump;
use crate::quoter::Quoter;
use crate::tender::{evaluate, Action};

pub struct Engine {
    client: SimClient,
    config: Config,
    ctx: EvaluationContext,
    pacer: SpeedBump,
    quoter: Option<Quoter>,
}

impl Engine {
    pub fn new(client: SimClient, config: Config) -> Self {
        let pacer = SpeedBump::new(config.order_rate, config.min_order_delay);
        let quoter = config.quoter_enabled.then(|| Quoter::new(&config));
        Self {
            client,
            config,
            ctx: EvaluationContext::new(),
            pacer,
            quoter,
        }
    }

    /// Poll until the shutdown flag is raised. The flag is only consulted
    /// between cycles, so an in-flight evaluation always completes.
    pub async fn run(&mut self, shutdown: &AtomicBool) -> Result<()> {
        let poll = Duration::from_millis(self.config.poll_interval_ms);
        while !shutdown.load(Ordering::Relaxed) {
            if let Err(e) = self.run_cycle().await {
                warn!("cycle failed: {e:#}");
            }
            tokio::time::sleep(poll).await;
        }
        info!("shutdown flag set, stopping");
        Ok(())
    }

    /// One full decision cycle over a fresh snapshot.
    pub async fn run_cycle(&mut self) -> Result<()> {
        let tick = self.client.get_tick().await?;
        let books = self.client.get_books(&self.config, false).await?;
        let books_with_fees = self.client.get_books(&self.config, true).await?;
        let portfolio = self.client.get_portfolio(&self.config).await?;
        let tenders = self.client.get_tenders(&self.config).await?;

        for tender in &tenders {
            match evaluate(
                tender,
                &books,
                &books_with_fees,
                &portfolio,
                tick,
                &self.config,
            ) {
                Ok(true) => {
                    info!(
                        security = tender.security.as_str(),
                        action = tender.action.as_str(),
                        quantity = tender.quantity,
                        price = tender.price,
                        "accepting tender"
                    );
                    self.client.accept_tender(tender.id).await?;
                    let signed = match tender.action {
                        Action::Buy => tender.quantity,
                        Action::Sell => -tender.quantity,
                    };
                    self.ctx.local_positions.apply_fill(&tender.security, signed);
                }
                Ok(false) => {
                    self.client.reject_tender(tender.id).await?;
                }
                Err(e) => warn!(tender_id = tender.id, "skipping tender: {e}"),
            }
        }

        // Arbitrage runs on the fee-adjusted book: a crossing that is not
        // profitable after venue costs is not a crossing worth acting on.
        let now_ms = Utc::now().timestamp_millis() as f64;
        let opportunities = find_opportunities(
            &books_with_fees,
            &mut self.ctx.history,
            &self.config.alternate_venue,
            now_ms,
        );
        for opportunity in opportunities {
            self.submit_opportunity(&opportunity).await?;
        }

        if let Some(quoter) = self.quoter.as_mut() {
            quoter.run_cycle(&self.client, &self.config, &portfolio).await?;
        }

        Ok(())
    }

    /// Fire both legs of one opportunity, flipped when history says so.
    async fn submit_opportunity(&mut self, opportunity: &Opportunity) -> Result<()> {
        let entries = self.ctx.history.entries(&opportunity.security);
        let classification = classify(&entries, opportunity.margin);

        let (ask_action, bid_action) = match classification {
            Classification::Natural => (Action::Buy, Action::Sell),
            Classification::Flip => {
                info!(
                    security = opportunity.security.as_str(),
                    "submitting flipped"
                );
                tokio::time::sleep(Duration::from_millis(flip::FLIP_DELAY_MS)).await;
                (Action::Sell, Action::Buy)
            }
        };

        let quantity = opportunity.amount.min(self.config.order_size_limit);
        let multi = self.config.multi_venue();
        let ask_ticker = join_venue_suffix(&opportunity.security, &opportunity.ask_venue, multi);
        let bid_ticker = join_venue_suffix(&opportunity.security, &opportunity.bid_venue, multi);

        let started = Instant::now();
        let ask_ok = self
            .client
            .submit_order(&ask_ticker, OrderType::Market, quantity, ask_action, None)
            .await?;
        let bid_ok = self
            .client
            .submit_order(&bid_ticker, OrderType::Market, quantity, bid_action, None)
            .await?;
        self.pacer.record(started.elapsed().as_secs_f64());

        if ask_ok && bid_ok {
            let flipped = classification == Classification::Flip;
            info!(
                security = opportunity.security.as_str(),
                quantity,
                margin = opportunity.margin,
                flipped,
                "arbitrage submitted"
            );
        } else {
            warn!(
                security = opportunity.security.as_str(),
                ask_ok, bid_ok, "arbitrage leg not acknowledged"
            );
        }

        tokio::time::sleep(self.pacer.required_delay()).await;
        Ok(())
    }

    pub fn context(&self) -> &EvaluationContext {
        &self.ctx
    }
}
