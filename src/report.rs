//! End-of-day read-only report: leverage, unrealized gain, concentration,
//! and total deviation from target.

use serde::Serialize;

use crate::host::PositionSnapshot;

/// The day's aggregate numbers, emitted to the metrics sink after the other
/// two checkpoints have run.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DailyReport {
    pub leverage: f64,
    /// `Σ (last_sale_price - cost_basis) * quantity` over held positions.
    pub unrealized: f64,
    /// Largest single position as a fraction of portfolio value.
    pub max_concentration: f64,
    /// `Σ |need|` over active registry entries at live prices.
    pub off_target: f64,
}

/// Aggregate positions and per-entry needs into a report. Pure; guards
/// `portfolio_value == 0` by reporting zero concentration.
pub fn compute(
    positions: &[PositionSnapshot],
    needs: &[f64],
    portfolio_value: f64,
    leverage: f64,
) -> DailyReport {
    let mut unrealized = 0.0;
    let mut max_concentration = 0.0_f64;
    for p in positions {
        unrealized += (p.last_price - p.cost_basis) * p.quantity as f64;
        if portfolio_value > 0.0 {
            let allocation = p.quantity as f64 * p.last_price / portfolio_value;
            max_concentration = max_concentration.max(allocation);
        }
    }

    DailyReport {
        leverage,
        unrealized,
        max_concentration,
        off_target: needs.iter().map(|n| n.abs()).sum(),
    }
}

impl std::fmt::Display for DailyReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "DAILY REPORT:")?;
        writeln!(f, "  Leverage:          {:>10.2}x", self.leverage)?;
        writeln!(f, "  Unrealized:        ${:>10.2}", self.unrealized)?;
        writeln!(
            f,
            "  Max concentration: {:>10.1}%",
            self.max_concentration * 100.0
        )?;
        writeln!(f, "  Off target:        ${:>10.2}", self.off_target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Symbol;

    fn position(ticker: &str, quantity: i64, cost: f64, last: f64) -> PositionSnapshot {
        PositionSnapshot {
            symbol: Symbol::new(ticker),
            quantity,
            cost_basis: cost,
            last_price: last,
        }
    }

    #[test]
    fn aggregates_gains_and_concentration() {
        let positions = [
            position("VUG", 100, 100.0, 110.0), // +$1000
            position("VTV", 50, 80.0, 70.0),    // -$500
        ];
        let report = compute(&positions, &[300.0, -200.0], 20_000.0, 1.0);

        assert!((report.unrealized - 500.0).abs() < 1e-9);
        // VUG: 100 * 110 / 20000 = 0.55
        assert!((report.max_concentration - 0.55).abs() < 1e-9);
        assert_eq!(report.off_target, 500.0);
        assert_eq!(report.leverage, 1.0);
    }

    #[test]
    fn zero_portfolio_value_guard() {
        let positions = [position("VUG", 100, 100.0, 110.0)];
        let report = compute(&positions, &[], 0.0, 0.0);
        assert_eq!(report.max_concentration, 0.0);
    }

    #[test]
    fn empty_positions() {
        let report = compute(&[], &[120.0], 10_000.0, 1.0);
        assert_eq!(report.unrealized, 0.0);
        assert_eq!(report.max_concentration, 0.0);
        assert_eq!(report.off_target, 120.0);
    }

    #[test]
    fn display_format() {
        let report = DailyReport {
            leverage: 1.02,
            unrealized: 1234.5,
            max_concentration: 0.15,
            off_target: 42.0,
        };
        let s = format!("{report}");
        assert!(s.contains("1.02x"));
        assert!(s.contains("15.0%"));
    }
}
