//! Mock host for testing: implements the collaborator traits with
//! configurable state and records every submitted order.
//!
//! ```ignore
//! use harvest_engine::mock::MockHost;
//! use harvest_engine::types::Symbol;
//!
//! let host = MockHost::builder()
//!     .with_position(Symbol::new("VUG"), 100, 95.0, 101.0)
//!     .with_price(Symbol::new("VUG"), 101.0)
//!     .with_account(100_000.0, 5_000.0, 1.0)
//!     .build();
//! ```

use std::sync::Mutex;

use rustc_hash::FxHashMap;

use crate::host::{
    HostError, HostResult, MarketData, MetricsSink, OrderGateway, PortfolioView, PositionSnapshot,
};
use crate::report::DailyReport;
use crate::types::Symbol;

/// A recorded order submission for assertion in tests.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordedOrder {
    LimitBuy {
        symbol: Symbol,
        shares: i64,
        limit_price: f64,
    },
    TargetWeight {
        symbol: Symbol,
        weight: f64,
    },
}

/// Builder for `MockHost`.
pub struct MockHostBuilder {
    positions: Vec<PositionSnapshot>,
    prices: FxHashMap<Symbol, f64>,
    histories: FxHashMap<Symbol, Vec<f64>>,
    untradable: Vec<Symbol>,
    portfolio_value: f64,
    cash: f64,
    leverage: f64,
    reject_orders: bool,
}

impl MockHostBuilder {
    pub fn with_position(
        mut self,
        symbol: Symbol,
        quantity: i64,
        cost_basis: f64,
        last_price: f64,
    ) -> Self {
        self.positions.push(PositionSnapshot {
            symbol,
            quantity,
            cost_basis,
            last_price,
        });
        self
    }

    pub fn with_price(mut self, symbol: Symbol, price: f64) -> Self {
        self.prices.insert(symbol, price);
        self
    }

    pub fn with_history(mut self, symbol: Symbol, history: &[f64]) -> Self {
        self.histories.insert(symbol, history.to_vec());
        self
    }

    pub fn with_account(mut self, portfolio_value: f64, cash: f64, leverage: f64) -> Self {
        self.portfolio_value = portfolio_value;
        self.cash = cash;
        self.leverage = leverage;
        self
    }

    pub fn untradable(mut self, symbol: Symbol) -> Self {
        self.untradable.push(symbol);
        self
    }

    /// Every order submission fails with an order error.
    pub fn reject_orders(mut self) -> Self {
        self.reject_orders = true;
        self
    }

    pub fn build(self) -> MockHost {
        MockHost {
            positions: self.positions,
            prices: self.prices,
            histories: self.histories,
            untradable: self.untradable,
            portfolio_value: self.portfolio_value,
            cash: self.cash,
            leverage: self.leverage,
            reject_orders: self.reject_orders,
            submitted: Mutex::new(Vec::new()),
            reports: Mutex::new(Vec::new()),
        }
    }
}

/// A host double returning configured state and recording submissions.
pub struct MockHost {
    positions: Vec<PositionSnapshot>,
    prices: FxHashMap<Symbol, f64>,
    histories: FxHashMap<Symbol, Vec<f64>>,
    untradable: Vec<Symbol>,
    portfolio_value: f64,
    cash: f64,
    leverage: f64,
    reject_orders: bool,
    submitted: Mutex<Vec<RecordedOrder>>,
    reports: Mutex<Vec<DailyReport>>,
}

impl MockHost {
    pub fn builder() -> MockHostBuilder {
        MockHostBuilder {
            positions: Vec::new(),
            prices: FxHashMap::default(),
            histories: FxHashMap::default(),
            untradable: Vec::new(),
            portfolio_value: 1_000_000.0,
            cash: 1_000_000.0,
            leverage: 1.0,
            reject_orders: false,
        }
    }

    /// All orders submitted so far (for assertion in tests).
    pub fn submitted_orders(&self) -> Vec<RecordedOrder> {
        self.submitted.lock().unwrap().clone()
    }

    /// All reports recorded so far.
    pub fn recorded_reports(&self) -> Vec<DailyReport> {
        self.reports.lock().unwrap().clone()
    }
}

impl MarketData for MockHost {
    fn current_price(&self, symbol: Symbol) -> HostResult<f64> {
        self.prices
            .get(&symbol)
            .copied()
            .ok_or_else(|| HostError::UnknownSymbol(symbol.as_str().to_string()))
    }

    fn price_history(&self, symbol: Symbol, window: usize) -> HostResult<Vec<f64>> {
        let series = self.histories.get(&symbol).cloned().unwrap_or_default();
        let start = series.len().saturating_sub(window);
        Ok(series[start..].to_vec())
    }
}

impl PortfolioView for MockHost {
    fn positions(&self) -> HostResult<Vec<PositionSnapshot>> {
        Ok(self.positions.clone())
    }

    fn portfolio_value(&self) -> HostResult<f64> {
        Ok(self.portfolio_value)
    }

    fn cash(&self) -> HostResult<f64> {
        Ok(self.cash)
    }

    fn leverage(&self) -> HostResult<f64> {
        Ok(self.leverage)
    }
}

impl OrderGateway for MockHost {
    fn is_tradable(&self, symbol: Symbol) -> HostResult<bool> {
        Ok(!self.untradable.contains(&symbol))
    }

    fn submit_limit_buy(&self, symbol: Symbol, shares: i64, limit_price: f64) -> HostResult<()> {
        if self.reject_orders {
            return Err(HostError::Order("mock: order rejected".into()));
        }
        self.submitted.lock().unwrap().push(RecordedOrder::LimitBuy {
            symbol,
            shares,
            limit_price,
        });
        Ok(())
    }

    fn submit_target_weight(&self, symbol: Symbol, weight: f64) -> HostResult<()> {
        if self.reject_orders {
            return Err(HostError::Order("mock: order rejected".into()));
        }
        self.submitted
            .lock()
            .unwrap()
            .push(RecordedOrder::TargetWeight { symbol, weight });
        Ok(())
    }
}

impl MetricsSink for MockHost {
    fn record(&self, report: &DailyReport) -> HostResult<()> {
        self.reports.lock().unwrap().push(*report);
        Ok(())
    }
}
