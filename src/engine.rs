//! Checkpoint orchestration: the three daily passes tying registry, policy,
//! sizer, and reporter to the host collaborators.
//!
//! The external scheduler invokes the checkpoints once per trading day, in
//! order: rebalance, buy, report. Buy sizing runs over the registry as the
//! rebalance pass left it (substitutions included), and the report reflects
//! the day's completed decisions. Any host failure aborts the checkpoint;
//! the registry is only mutated after the triggering order was accepted, so
//! a substitution is either fully applied or not applied at all.

use log::{debug, info, warn};
use rustc_hash::FxHashMap;

use crate::allocation::{self, BuyCandidate, BuyOrder};
use crate::audit::{self, AuditLog};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::host::{MarketData, MetricsSink, OrderGateway, PortfolioView, PositionSnapshot};
use crate::rebalance::{self, AssetObservation, PolicyAction};
use crate::registry::Registry;
use crate::report::{self, DailyReport};
use crate::types::Symbol;

/// The allocation engine: decision constants plus the registry they act on.
pub struct Engine {
    config: EngineConfig,
    registry: Registry,
}

/// What the rebalance checkpoint did, for display and assertions.
#[derive(Debug, Default)]
pub struct RebalanceSummary {
    pub orphans_liquidated: Vec<Symbol>,
    pub trims: Vec<Symbol>,
    /// Principal and the substitute that replaced it.
    pub harvests: Vec<(Symbol, Symbol)>,
    pub defensive_trims: Vec<Symbol>,
}

impl RebalanceSummary {
    pub fn is_quiet(&self) -> bool {
        self.orphans_liquidated.is_empty()
            && self.trims.is_empty()
            && self.harvests.is_empty()
            && self.defensive_trims.is_empty()
    }
}

/// Result of a full daily cycle.
#[derive(Debug)]
pub struct CycleOutcome {
    pub rebalance: RebalanceSummary,
    pub buys: Vec<BuyOrder>,
    pub report: DailyReport,
}

impl Engine {
    pub fn new(config: EngineConfig, registry: Registry) -> Self {
        Self { config, registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// First checkpoint: orphan liquidation, days-held accounting, and the
    /// per-asset trim / harvest / defensive-trim policy.
    pub fn rebalance_checkpoint<H>(&mut self, host: &H, audit: &mut AuditLog) -> Result<RebalanceSummary>
    where
        H: MarketData + PortfolioView + OrderGateway,
    {
        audit::log_checkpoint_started(audit, "rebalance")?;
        let mut summary = RebalanceSummary::default();

        let positions = host.positions()?;
        let held: FxHashMap<Symbol, PositionSnapshot> =
            positions.iter().map(|p| (p.symbol, *p)).collect();

        // Positions the registry no longer tracks get closed out entirely,
        // whether left over from a substitution or placed externally.
        for p in &positions {
            if p.quantity != 0 && !self.registry.contains(p.symbol) {
                host.submit_target_weight(p.symbol, 0.0)?;
                audit::log_orphan_liquidated(audit, p.symbol, p.quantity)?;
                info!("Liquidating orphan {} ({} shares)", p.symbol, p.quantity);
                summary.orphans_liquidated.push(p.symbol);
            }
        }

        let mut prices: FxHashMap<Symbol, f64> = FxHashMap::default();
        for sym in self.registry.symbols() {
            prices.insert(sym, host.current_price(sym)?);
        }

        // Days held advances for every entry with a positive balance today.
        for sym in self.registry.symbols() {
            let quantity = held.get(&sym).map_or(0, |p| p.quantity);
            let price = prices.get(&sym).copied().unwrap_or(0.0);
            if quantity as f64 * price > 0.0 {
                if let Some(entry) = self.registry.get_mut(sym) {
                    entry.days_held += 1;
                }
            }
        }

        let portfolio_value = host.portfolio_value()?;
        if portfolio_value <= 0.0 {
            warn!("portfolio value is non-positive, skipping policy evaluation");
        } else {
            self.evaluate_policies(host, audit, &held, &prices, portfolio_value, &mut summary)?;
        }

        info!("Registry after rebalance:\n{}", self.registry);
        audit::log_checkpoint_completed(audit, "rebalance", &self.registry)?;
        Ok(summary)
    }

    fn evaluate_policies<H>(
        &mut self,
        host: &H,
        audit: &mut AuditLog,
        held: &FxHashMap<Symbol, PositionSnapshot>,
        prices: &FxHashMap<Symbol, f64>,
        portfolio_value: f64,
        summary: &mut RebalanceSummary,
    ) -> Result<()>
    where
        H: MarketData + PortfolioView + OrderGateway,
    {
        let margin = self.config.margin_capacity;

        // Snapshot of symbols: a harvest replaces the current entry, and the
        // incoming substitute must not be evaluated until tomorrow.
        for sym in self.registry.symbols() {
            let Some(entry) = self.registry.get(sym).copied() else {
                continue;
            };
            if !host.is_tradable(sym)? {
                debug!("{sym} untradable today, policy deferred");
                continue;
            }

            let pos = held.get(&sym).copied();
            let quantity = pos.map_or(0, |p| p.quantity);
            let cost_basis = pos.map_or(0.0, |p| p.cost_basis);
            let price = prices.get(&sym).copied().unwrap_or(0.0);
            let balance = quantity as f64 * price;

            let obs = AssetObservation {
                symbol: sym,
                quantity,
                cost_basis,
                current_price: price,
                current_weight: allocation::current_weight(balance, portfolio_value),
                target_weight: entry.weight * (portfolio_value + margin) / portfolio_value,
            };

            let unrealized = rebalance::unrealized_return(price, cost_basis);
            let gain = (price - cost_basis) * quantity as f64;

            match rebalance::evaluate(&obs, &entry, &self.config) {
                Some(PolicyAction::Trim { target_weight }) => {
                    host.submit_target_weight(sym, target_weight)?;
                    info!(
                        "Trim: {sym} | gains ${gain:.2} | return {:.2}%",
                        unrealized.unwrap_or(0.0) * 100.0
                    );
                    audit::log_policy_action(
                        audit,
                        "trim",
                        sym,
                        unrealized,
                        serde_json::json!({ "target_weight": target_weight }),
                    )?;
                    summary.trims.push(sym);
                }
                Some(PolicyAction::Harvest { substitute }) => {
                    // Liquidate first; the registry swap happens only once
                    // the order was accepted.
                    host.submit_target_weight(sym, 0.0)?;
                    self.registry.apply_substitution(sym)?;
                    info!(
                        "Tax loss harvest: {sym} -> {substitute} | gains ${gain:.2} | return {:.2}%",
                        unrealized.unwrap_or(0.0) * 100.0
                    );
                    audit::log_policy_action(
                        audit,
                        "harvest",
                        sym,
                        unrealized,
                        serde_json::json!({ "substitute": substitute.as_str() }),
                    )?;
                    summary.harvests.push((sym, substitute));
                }
                Some(PolicyAction::DefensiveTrim { target_weight }) => {
                    host.submit_target_weight(sym, target_weight)?;
                    info!(
                        "Trim: {sym} | gains ${gain:.2} | return {:.2}%",
                        unrealized.unwrap_or(0.0) * 100.0
                    );
                    audit::log_policy_action(
                        audit,
                        "defensive_trim",
                        sym,
                        unrealized,
                        serde_json::json!({ "target_weight": target_weight }),
                    )?;
                    summary.defensive_trims.push(sym);
                }
                None => {}
            }
        }
        Ok(())
    }

    /// Second checkpoint: size whole-share buys for under-target assets and
    /// submit them at the moving-average limit price.
    pub fn buy_checkpoint<H>(&self, host: &H, audit: &mut AuditLog) -> Result<Vec<BuyOrder>>
    where
        H: MarketData + PortfolioView + OrderGateway,
    {
        audit::log_checkpoint_started(audit, "buy")?;

        let positions = host.positions()?;
        let held: FxHashMap<Symbol, i64> =
            positions.iter().map(|p| (p.symbol, p.quantity)).collect();
        let portfolio_value = host.portfolio_value()?;
        let margin = self.config.margin_capacity;

        let mut candidates: Vec<BuyCandidate> = Vec::with_capacity(self.registry.len());
        let mut weights: Vec<(f64, f64)> = Vec::with_capacity(self.registry.len());
        for (sym, entry) in self.registry.iter() {
            let live = host.current_price(sym)?;
            let balance = held.get(&sym).copied().unwrap_or(0) as f64 * live;
            let history = host.price_history(sym, self.config.sma_window)?;
            let Some(price) = allocation::moving_average(&history) else {
                warn!("{sym}: no usable price history, excluded from today's sizing");
                continue;
            };
            candidates.push(BuyCandidate {
                symbol: sym,
                need: allocation::need(entry.weight, balance, portfolio_value, margin),
                price,
            });
            weights.push((entry.weight, allocation::current_weight(balance, portfolio_value)));
        }

        let cash = host.cash()? + margin;
        let orders = allocation::size_buys(&candidates, cash, self.config.min_buy);
        audit::log_buys_sized(audit, &orders, cash)?;
        log_sizing_table(&candidates, &weights, &orders);

        let mut submitted = Vec::new();
        for order in &orders {
            if order.shares == 0 {
                continue;
            }
            if !host.is_tradable(order.symbol)? {
                debug!("{} untradable today, buy deferred", order.symbol);
                continue;
            }
            host.submit_limit_buy(order.symbol, order.shares, order.limit_price)?;
            audit::log_buy_submitted(audit, order)?;
            submitted.push(*order);
        }

        audit::log_checkpoint_completed(audit, "buy", &self.registry)?;
        Ok(submitted)
    }

    /// Third checkpoint: read-only aggregation, emitted to the metrics sink.
    pub fn report_checkpoint<H>(&self, host: &H, audit: &mut AuditLog) -> Result<DailyReport>
    where
        H: MarketData + PortfolioView + MetricsSink,
    {
        audit::log_checkpoint_started(audit, "report")?;

        let positions = host.positions()?;
        let held: FxHashMap<Symbol, i64> =
            positions.iter().map(|p| (p.symbol, p.quantity)).collect();
        let portfolio_value = host.portfolio_value()?;
        let leverage = host.leverage()?;

        let mut needs = Vec::with_capacity(self.registry.len());
        for (sym, entry) in self.registry.iter() {
            let live = host.current_price(sym)?;
            let balance = held.get(&sym).copied().unwrap_or(0) as f64 * live;
            needs.push(allocation::need(
                entry.weight,
                balance,
                portfolio_value,
                self.config.margin_capacity,
            ));
        }

        let daily = report::compute(&positions, &needs, portfolio_value, leverage);
        host.record(&daily)?;
        audit::log_report(audit, &daily)?;
        info!("{daily}");
        Ok(daily)
    }

    /// All three checkpoints in their required order.
    pub fn run_cycle<H>(&mut self, host: &H, audit: &mut AuditLog) -> Result<CycleOutcome>
    where
        H: MarketData + PortfolioView + OrderGateway + MetricsSink,
    {
        let rebalance = self.rebalance_checkpoint(host, audit)?;
        let buys = self.buy_checkpoint(host, audit)?;
        let report = self.report_checkpoint(host, audit)?;
        Ok(CycleOutcome {
            rebalance,
            buys,
            report,
        })
    }
}

fn log_sizing_table(candidates: &[BuyCandidate], weights: &[(f64, f64)], orders: &[BuyOrder]) {
    let mut table = format!(
        "  {:8} {:>8} {:>8} {:>10} {:>10} {:>7} {:>9}\n",
        "Symbol", "Weight", "Curr", "Need", "Get", "Shares", "Price"
    );
    for ((c, (weight, curr)), o) in candidates.iter().zip(weights).zip(orders) {
        table.push_str(&format!(
            "  {:8} {:>7.2}% {:>7.2}% {:>10.2} {:>10.2} {:>7} {:>9.2}\n",
            c.symbol,
            weight * 100.0,
            curr * 100.0,
            c.need,
            o.notional,
            o.shares,
            o.limit_price,
        ));
    }
    info!("Buy sizing:\n{table}");
}
