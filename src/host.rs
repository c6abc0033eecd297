//! Collaborator traits: the host environment the engine runs against.
//!
//! The engine owns no market data, portfolio state, or order plumbing of its
//! own. Each daily checkpoint is handed an object implementing these traits;
//! a failure in any call aborts that checkpoint and propagates to the caller.

use crate::types::Symbol;

/// Errors surfaced by host collaborators.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("market data error: {0}")]
    Data(String),

    #[error("order error: {0}")]
    Order(String),

    #[error("metrics sink error: {0}")]
    Sink(String),

    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),
}

pub type HostResult<T> = std::result::Result<T, HostError>;

/// A held position as reported by the portfolio accessor.
///
/// `quantity` is whole shares; `cost_basis` and `last_price` are per-share
/// dollar amounts. A zero or negative `cost_basis` means the basis is
/// unknown and unrealized return is undefined for this position.
#[derive(Debug, Clone, Copy)]
pub struct PositionSnapshot {
    pub symbol: Symbol,
    pub quantity: i64,
    pub cost_basis: f64,
    pub last_price: f64,
}

/// Live and historical prices.
pub trait MarketData {
    /// Current market price for an asset.
    fn current_price(&self, symbol: Symbol) -> HostResult<f64>;

    /// Trailing daily prices, most recent last, at most `window` observations.
    fn price_history(&self, symbol: Symbol, window: usize) -> HostResult<Vec<f64>>;
}

/// Read access to account state.
pub trait PortfolioView {
    fn positions(&self) -> HostResult<Vec<PositionSnapshot>>;
    fn portfolio_value(&self) -> HostResult<f64>;
    fn cash(&self) -> HostResult<f64>;
    fn leverage(&self) -> HostResult<f64>;
}

/// Order submission. The host applies submitted orders durably; the engine
/// never observes fills directly, only next-day positions.
pub trait OrderGateway {
    fn is_tradable(&self, symbol: Symbol) -> HostResult<bool>;

    /// Buy `shares` whole shares at or below `limit_price`.
    fn submit_limit_buy(&self, symbol: Symbol, shares: i64, limit_price: f64) -> HostResult<()>;

    /// Move a position to `weight` of portfolio value. Weight 0 liquidates.
    fn submit_target_weight(&self, symbol: Symbol, weight: f64) -> HostResult<()>;
}

/// End-of-day metrics consumer.
pub trait MetricsSink {
    fn record(&self, report: &crate::report::DailyReport) -> HostResult<()>;
}
