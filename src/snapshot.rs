//! File-backed host for offline runs.
//!
//! A day snapshot is a JSON export of host state (positions, cash, prices,
//! trailing history) produced by whatever feeds the engine. `SnapshotHost`
//! serves that file through the collaborator traits and records order
//! submissions for display instead of routing them anywhere, which is what
//! the CLI wants: compute and audit today's decisions from a snapshot.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use log::info;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::host::{
    HostError, HostResult, MarketData, MetricsSink, OrderGateway, PortfolioView, PositionSnapshot,
};
use crate::report::DailyReport;
use crate::types::Symbol;

/// One day of host state, as exported to JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct DaySnapshot {
    pub portfolio_value: f64,
    pub cash: f64,
    #[serde(default = "default_leverage")]
    pub leverage: f64,
    #[serde(default)]
    pub positions: Vec<SnapshotPosition>,
    /// Current market price per symbol.
    pub prices: HashMap<String, f64>,
    /// Trailing daily closes per symbol, most recent last.
    #[serde(default)]
    pub history: HashMap<String, Vec<f64>>,
    /// Symbols halted or otherwise untradable today.
    #[serde(default)]
    pub halted: Vec<String>,
}

fn default_leverage() -> f64 {
    1.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotPosition {
    pub symbol: String,
    pub quantity: i64,
    pub cost_basis: f64,
    pub last_price: f64,
}

impl DaySnapshot {
    /// Load a snapshot file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::SnapshotRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let snapshot: DaySnapshot = serde_json::from_str(&contents)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Parse from a JSON string (useful for testing).
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: DaySnapshot = serde_json::from_str(json)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    fn validate(&self) -> Result<()> {
        if self.portfolio_value < 0.0 {
            return Err(Error::Snapshot("portfolio_value must be >= 0".into()));
        }
        for (ticker, price) in &self.prices {
            if ticker.is_empty() || ticker.len() > 8 {
                return Err(Error::Snapshot(format!("bad ticker {ticker:?} in prices")));
            }
            if *price <= 0.0 {
                return Err(Error::Snapshot(format!(
                    "price for {ticker} must be > 0, got {price}"
                )));
            }
        }
        Ok(())
    }
}

/// An order the engine would have submitted, kept for display.
#[derive(Debug, Clone, Copy)]
pub enum PlannedOrder {
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

impl std::fmt::Display for PlannedOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlannedOrder::LimitBuy {
                symbol,
                shares,
                limit_price,
            } => write!(f, "BUY  {symbol:8} {shares:>6} @ limit ${limit_price:.2}"),
            PlannedOrder::TargetWeight { symbol, weight } if *weight == 0.0 => {
                write!(f, "SELL {symbol:8} to zero")
            }
            PlannedOrder::TargetWeight { symbol, weight } => {
                write!(f, "SELL {symbol:8} down to {:.2}%", weight * 100.0)
            }
        }
    }
}

/// Host implementation over a loaded day snapshot.
pub struct SnapshotHost {
    snapshot: DaySnapshot,
    planned: Mutex<Vec<PlannedOrder>>,
}

impl SnapshotHost {
    pub fn new(snapshot: DaySnapshot) -> Self {
        Self {
            snapshot,
            planned: Mutex::new(Vec::new()),
        }
    }

    /// Orders the engine submitted against this snapshot.
    pub fn planned_orders(&self) -> Vec<PlannedOrder> {
        self.planned.lock().unwrap().clone()
    }
}

impl MarketData for SnapshotHost {
    fn current_price(&self, symbol: Symbol) -> HostResult<f64> {
        self.snapshot
            .prices
            .get(symbol.as_str())
            .copied()
            .ok_or_else(|| HostError::UnknownSymbol(symbol.as_str().to_string()))
    }

    fn price_history(&self, symbol: Symbol, window: usize) -> HostResult<Vec<f64>> {
        let series = self
            .snapshot
            .history
            .get(symbol.as_str())
            .cloned()
            .unwrap_or_default();
        let start = series.len().saturating_sub(window);
        Ok(series[start..].to_vec())
    }
}

impl PortfolioView for SnapshotHost {
    fn positions(&self) -> HostResult<Vec<PositionSnapshot>> {
        self.snapshot
            .positions
            .iter()
            .map(|p| {
                if p.symbol.is_empty() || p.symbol.len() > 8 {
                    return Err(HostError::UnknownSymbol(p.symbol.clone()));
                }
                Ok(PositionSnapshot {
                    symbol: Symbol::new(&p.symbol),
                    quantity: p.quantity,
                    cost_basis: p.cost_basis,
                    last_price: p.last_price,
                })
            })
            .collect()
    }

    fn portfolio_value(&self) -> HostResult<f64> {
        Ok(self.snapshot.portfolio_value)
    }

    fn cash(&self) -> HostResult<f64> {
        Ok(self.snapshot.cash)
    }

    fn leverage(&self) -> HostResult<f64> {
        Ok(self.snapshot.leverage)
    }
}

impl OrderGateway for SnapshotHost {
    fn is_tradable(&self, symbol: Symbol) -> HostResult<bool> {
        Ok(!self.snapshot.halted.iter().any(|h| h == symbol.as_str()))
    }

    fn submit_limit_buy(&self, symbol: Symbol, shares: i64, limit_price: f64) -> HostResult<()> {
        self.planned.lock().unwrap().push(PlannedOrder::LimitBuy {
            symbol,
            shares,
            limit_price,
        });
        Ok(())
    }

    fn submit_target_weight(&self, symbol: Symbol, weight: f64) -> HostResult<()> {
        self.planned
            .lock()
            .unwrap()
            .push(PlannedOrder::TargetWeight { symbol, weight });
        Ok(())
    }
}

impl MetricsSink for SnapshotHost {
    fn record(&self, report: &DailyReport) -> HostResult<()> {
        info!("{report}");
        Ok(())
    }
}
