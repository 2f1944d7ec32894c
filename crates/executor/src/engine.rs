//! The execution engine: run/stop lifecycle and the tick loop.
//!
//! One background task runs the loop. Each tick takes a snapshot of the
//! settings, then for every symbol aggregates prices, detects and evaluates
//! the best spatial opportunity, and records (simulation) or places (live)
//! the trade. Configured triangles are scanned after the symbols. Stop is
//! cooperative: the cancellation token is checked between symbols, between
//! ticks and before orders go out.

use crate::order::place_legs;
use crate::state::{ConfigHandle, StatusHandle};
use crate::{EngineError, ExecutorError, ExecutorResult};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tickarb_alerts::Notifier;
use tickarb_core::{
    BotConfig, EvaluatedOpportunity, Exchange, Opportunity, Symbol, TradeRecord, TradeSide,
    TriangleSettings,
};
use tickarb_engine::{
    evaluate, evaluate_opportunity, find_spatial, find_triangular, has_liquidity, resolve_fee,
    Liquidity,
};
use tickarb_feeds::{ExchangeGateway, GatewayProvider, PriceAggregator, SharedGateway};
use tickarb_journal::{OpportunityLog, TradeLog};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

struct ActiveRun {
    token: CancellationToken,
    task: JoinHandle<()>,
}

struct Shared {
    provider: Arc<dyn GatewayProvider>,
    config: ConfigHandle,
    status: StatusHandle,
    opportunities: Arc<OpportunityLog>,
    trades: Arc<TradeLog>,
    notifier: Notifier,
}

/// Owns the run/stop lifecycle. Cheap to clone; clones share one engine.
#[derive(Clone)]
pub struct ExecutionEngine {
    shared: Arc<Shared>,
    run: Arc<Mutex<Option<ActiveRun>>>,
}

impl ExecutionEngine {
    pub fn new(
        provider: Arc<dyn GatewayProvider>,
        config: ConfigHandle,
        opportunities: Arc<OpportunityLog>,
        trades: Arc<TradeLog>,
        notifier: Notifier,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                provider,
                config,
                status: StatusHandle::new(),
                opportunities,
                trades,
                notifier,
            }),
            run: Arc::new(Mutex::new(None)),
        }
    }

    pub fn status(&self) -> &StatusHandle {
        &self.shared.status
    }

    pub fn config(&self) -> &ConfigHandle {
        &self.shared.config
    }

    pub fn opportunities(&self) -> &OpportunityLog {
        &self.shared.opportunities
    }

    pub fn trades(&self) -> &TradeLog {
        &self.shared.trades
    }

    /// Start the loop. Fails without side effects if a loop is already running.
    pub async fn start(&self) -> ExecutorResult<()> {
        let mut run = self.run.lock().await;
        if run.as_ref().is_some_and(|active| !active.token.is_cancelled()) {
            return Err(ExecutorError::AlreadyRunning);
        }

        let generation = self.shared.status.begin_run(Utc::now()).await;
        let token = CancellationToken::new();
        let task = tokio::spawn(run_loop(Arc::clone(&self.shared), generation, token.clone()));
        *run = Some(ActiveRun { token, task });

        info!(generation, "Engine started");
        Ok(())
    }

    /// Request a stop. The status freezes immediately; the loop exits at its
    /// next cancellation check. Returns false when nothing was running, in
    /// which case the status is left as it was.
    pub async fn stop(&self) -> bool {
        let active = self.run.lock().await.take();
        self.shared.status.mark_stopped().await;
        match active {
            Some(active) if !active.token.is_cancelled() => {
                active.token.cancel();
                info!("Engine stop requested");
                true
            }
            _ => false,
        }
    }

    /// Stop and wait up to `grace` for the loop to exit.
    pub async fn shutdown(&self, grace: Duration) {
        let active = self.run.lock().await.take();
        self.shared.status.mark_stopped().await;
        let Some(active) = active else {
            return;
        };

        active.token.cancel();
        match tokio::time::timeout(grace, active.task).await {
            Ok(Ok(())) => info!("Engine loop exited"),
            Ok(Err(e)) => error!(error = %e, "Engine loop panicked"),
            Err(_) => warn!(grace_ms = grace.as_millis() as u64, "Engine loop still busy at shutdown"),
        }
    }
}

async fn run_loop(shared: Arc<Shared>, generation: u64, token: CancellationToken) {
    let runner = Runner {
        shared: &shared,
        generation,
        token: &token,
    };

    if let Err(e) = runner.run().await {
        runner.record_error(format!("Bot crashed: {}", e)).await;
    }
    // A cancelled token marks the run as over for start and stop.
    token.cancel();
    shared.status.finish_run(generation).await;
    debug!(generation, "Engine loop finished");
}

fn find_gateway(gateways: &[SharedGateway], exchange: Exchange) -> Option<&SharedGateway> {
    gateways.iter().find(|g| g.exchange() == exchange)
}

/// One run of the loop, bound to its generation and cancellation token.
struct Runner<'a> {
    shared: &'a Shared,
    generation: u64,
    token: &'a CancellationToken,
}

impl Runner<'_> {
    async fn run(&self) -> Result<(), EngineError> {
        let exchanges = self.shared.config.snapshot().await.exchanges;
        let gateways = self
            .shared
            .provider
            .connect(&exchanges)
            .await
            .map_err(EngineError::Init)?;
        info!(gateways = gateways.len(), "Gateways connected");

        loop {
            if self.token.is_cancelled() {
                break;
            }

            let config = self.shared.config.snapshot().await;
            self.tick(&gateways, &config).await?;

            let interval = Duration::from_secs(config.check_interval_seconds);
            tokio::select! {
                _ = self.token.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }
        Ok(())
    }

    async fn tick(&self, gateways: &[SharedGateway], config: &BotConfig) -> Result<(), EngineError> {
        // Exchanges removed from the settings mid-run drop out here; added
        // ones need a restart to connect.
        let active: Vec<SharedGateway> = gateways
            .iter()
            .filter(|g| config.exchanges.contains(&g.exchange()))
            .cloned()
            .collect();
        let aggregator = PriceAggregator::new(active);

        for symbol in &config.symbols {
            if self.token.is_cancelled() {
                return Ok(());
            }
            let result = self.process_symbol(&aggregator, symbol, config).await;
            self.dispatch(result, &symbol.to_string()).await?;
        }

        for triangle in &config.triangles {
            let targets = aggregator
                .gateways()
                .iter()
                .filter(|g| triangle.exchange.map_or(true, |ex| ex == g.exchange()));
            for gateway in targets {
                if self.token.is_cancelled() {
                    return Ok(());
                }
                let result = self.process_triangle(gateway.as_ref(), triangle, config).await;
                self.dispatch(result, &format!("{} on {}", triangle, gateway.exchange()))
                    .await?;
            }
        }

        self.shared
            .status
            .update(self.generation, |s| s.ticks += 1)
            .await;
        Ok(())
    }

    /// Fatal errors escape the tick; everything else is recorded here.
    async fn dispatch(&self, result: Result<(), EngineError>, context: &str) -> Result<(), EngineError> {
        match result {
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                self.record_error(format!("Error processing {}: {}", context, e))
                    .await;
                Ok(())
            }
            Ok(()) => Ok(()),
        }
    }

    async fn record_error(&self, message: String) {
        error!("{}", message);
        self.shared
            .status
            .update(self.generation, |s| s.push_error(message.clone()))
            .await;
        self.shared.notifier.notify(&message).await;
    }

    async fn add_warnings(&self, count: usize) {
        if count == 0 {
            return;
        }
        self.shared
            .status
            .update(self.generation, |s| s.warnings += count as u64)
            .await;
    }

    async fn process_symbol(
        &self,
        aggregator: &PriceAggregator,
        symbol: &Symbol,
        config: &BotConfig,
    ) -> Result<(), EngineError> {
        let aggregation = aggregator.aggregate(symbol).await;
        self.add_warnings(aggregation.failures.len()).await;

        let Some(opportunity) = find_spatial(&aggregation.snapshot, config.min_profit)
            .into_iter()
            .next()
        else {
            return Ok(());
        };
        let gateways = aggregator.gateways();
        let (Some(buy_gateway), Some(sell_gateway)) = (
            find_gateway(gateways, opportunity.buy_exchange),
            find_gateway(gateways, opportunity.sell_exchange),
        ) else {
            return Ok(());
        };

        let evaluated = self
            .evaluate_spatial(
                opportunity,
                buy_gateway.as_ref(),
                sell_gateway.as_ref(),
                config.trade_amount,
            )
            .await;
        info!(opportunity = %evaluated, "Arbitrage opportunity");

        self.shared
            .status
            .update(self.generation, |s| s.last_opportunity = Some(evaluated.clone()))
            .await;
        let logged = self.shared.opportunities.append(&evaluated).await;
        self.shared
            .notifier
            .notify(&format!("Arbitrage opportunity: {}", evaluated))
            .await;

        if evaluated.is_actionable() {
            if self.token.is_cancelled() {
                debug!(symbol = %symbol, "Stop requested, skipping trade");
            } else {
                self.execute(evaluated, buy_gateway.as_ref(), sell_gateway.as_ref(), config)
                    .await?;
            }
        }

        logged?;
        Ok(())
    }

    /// Fees for both sides, net profit, and (for a profitable spread) depth
    /// on both books.
    async fn evaluate_spatial(
        &self,
        opportunity: Opportunity,
        buy_gateway: &dyn ExchangeGateway,
        sell_gateway: &dyn ExchangeGateway,
        amount: f64,
    ) -> EvaluatedOpportunity {
        let symbol = opportunity.symbol.clone();
        let (buy_fee, sell_fee) = tokio::join!(
            resolve_fee(buy_gateway, &symbol, TradeSide::Buy),
            resolve_fee(sell_gateway, &symbol, TradeSide::Sell),
        );
        self.add_warnings([buy_fee, sell_fee].iter().filter(|f| f.defaulted).count())
            .await;

        let net_profit = evaluate(&opportunity, amount, buy_fee.rate, sell_fee.rate);
        let liquidity_ok = if net_profit > 0.0 {
            let (buy_side, sell_side) = tokio::join!(
                has_liquidity(buy_gateway, &symbol, amount, TradeSide::Buy),
                has_liquidity(sell_gateway, &symbol, amount, TradeSide::Sell),
            );
            self.add_warnings(
                [buy_side, sell_side]
                    .iter()
                    .filter(|l| **l == Liquidity::Unavailable)
                    .count(),
            )
            .await;
            buy_side.is_sufficient() && sell_side.is_sufficient()
        } else {
            false
        };

        evaluate_opportunity(opportunity, amount, buy_fee.rate, sell_fee.rate, liquidity_ok)
    }

    async fn execute(
        &self,
        evaluated: EvaluatedOpportunity,
        buy_gateway: &dyn ExchangeGateway,
        sell_gateway: &dyn ExchangeGateway,
        config: &BotConfig,
    ) -> Result<(), EngineError> {
        let net_profit = evaluated.net_profit;
        let symbol = evaluated.opportunity.symbol.clone();

        let record = if config.simulation_mode {
            info!(symbol = %symbol, net_profit, "Simulated trade");
            TradeRecord::simulated(evaluated)
        } else {
            let legs = place_legs(buy_gateway, sell_gateway, &symbol, evaluated.trade_amount).await;
            for (gateway, side, result) in [
                (buy_gateway, TradeSide::Buy, &legs.buy),
                (sell_gateway, TradeSide::Sell, &legs.sell),
            ] {
                if let Err(e) = result {
                    self.record_error(format!(
                        "{} order for {} on {} failed: {}",
                        side,
                        symbol,
                        gateway.exchange(),
                        e
                    ))
                    .await;
                }
            }
            let (buy_order, sell_order) = legs.into_orders();
            TradeRecord::live(evaluated, buy_order, sell_order)
        };

        // The counters only move once the trade log holds the record.
        self.shared.trades.append(&record).await?;
        let realised = if record.outcome.is_complete() { net_profit } else { 0.0 };
        self.shared
            .status
            .update(self.generation, |s| s.record_trade(realised))
            .await;
        Ok(())
    }

    async fn process_triangle(
        &self,
        gateway: &dyn ExchangeGateway,
        triangle: &TriangleSettings,
        config: &BotConfig,
    ) -> Result<(), EngineError> {
        let scan = find_triangular(
            gateway,
            &triangle.base,
            &triangle.quote,
            &triangle.intermediate,
        )
        .await;
        self.add_warnings(usize::from(scan.failure.is_some())).await;

        for opportunity in scan.opportunities {
            let evaluated = self
                .evaluate_triangular(gateway, opportunity, config.trade_amount)
                .await;
            info!(opportunity = %evaluated, "Triangular opportunity");

            let logged = self.shared.opportunities.append(&evaluated).await;
            self.shared
                .notifier
                .notify(&format!("Triangular opportunity: {}", evaluated))
                .await;
            logged?;
        }
        Ok(())
    }

    /// Buy fee on the direct pair; the sell fee is the sum of the two
    /// conversions back into the quote asset. Triangles are never executed,
    /// so liquidity is not checked.
    async fn evaluate_triangular(
        &self,
        gateway: &dyn ExchangeGateway,
        opportunity: Opportunity,
        amount: f64,
    ) -> EvaluatedOpportunity {
        let buy_fee = resolve_fee(gateway, &opportunity.symbol, TradeSide::Buy).await;
        let mut defaulted = usize::from(buy_fee.defaulted);
        let mut sell_fee = 0.0;
        for step in opportunity.path.iter().skip(1) {
            let fee = resolve_fee(gateway, &step.symbol, step.side).await;
            sell_fee += fee.rate;
            defaulted += usize::from(fee.defaulted);
        }
        self.add_warnings(defaulted).await;

        evaluate_opportunity(opportunity, amount, buy_fee.rate, sell_fee, false)
    }
}
