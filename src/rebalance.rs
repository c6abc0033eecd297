//! Daily trim / harvest / defensive-trim policy.
//!
//! Pure decision logic: given one asset's observed state, pick at most one
//! action. The engine applies the action (order submission plus any registry
//! mutation) so substitution stays atomic with respect to host failures.

use crate::config::EngineConfig;
use crate::registry::AssetEntry;
use crate::types::Symbol;

/// Observed state for one active asset on policy day.
#[derive(Debug, Clone, Copy)]
pub struct AssetObservation {
    pub symbol: Symbol,
    /// Whole shares currently held (0 when the host reports no position).
    pub quantity: i64,
    /// Average per-share cost; non-positive means unknown.
    pub cost_basis: f64,
    pub current_price: f64,
    /// Held balance as a fraction of portfolio value.
    pub current_weight: f64,
    /// Target weight scaled by the margin facility,
    /// `weight * (pv + margin) / pv`.
    pub target_weight: f64,
}

/// The one action policy evaluation may select for an asset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PolicyAction {
    /// Position grew past target: sell back down to `target_weight`.
    Trim { target_weight: f64 },
    /// Loss old enough to harvest: liquidate and rotate into `substitute`.
    Harvest { substitute: Symbol },
    /// Losing position with no substitute: sell back down to target instead.
    DefensiveTrim { target_weight: f64 },
}

/// Evaluate the day's policy for one asset. First match wins, in order
/// trim, harvest, defensive trim. Returns `None` when nothing fires or when
/// the cost basis is unknown (unrealized return would be undefined).
///
/// Trim and defensive trim submit the same order from different guards
/// (over-weight versus unrealized loss); they are deliberately separate
/// variants so the audit trail distinguishes them.
pub fn evaluate(obs: &AssetObservation, entry: &AssetEntry, config: &EngineConfig) -> Option<PolicyAction> {
    if obs.cost_basis <= 0.0 {
        return None;
    }
    let unrealized_return = obs.current_price / obs.cost_basis - 1.0;
    let diff = obs.current_weight - obs.target_weight;

    if obs.quantity > 0 && diff > config.rebalance_threshold {
        return Some(PolicyAction::Trim {
            target_weight: obs.target_weight,
        });
    }

    if entry.days_held > config.harvest_min_days && unrealized_return < config.harvest_threshold {
        if let Some(substitute) = entry.substitute {
            return Some(PolicyAction::Harvest { substitute });
        }
    }

    if obs.quantity > 0
        && entry.substitute.is_none()
        && unrealized_return < -config.rebalance_threshold
    {
        return Some(PolicyAction::DefensiveTrim {
            target_weight: obs.target_weight,
        });
    }

    None
}

/// Unrealized return for display, `None` when the basis is unknown.
pub fn unrealized_return(current_price: f64, cost_basis: f64) -> Option<f64> {
    (cost_basis > 0.0).then(|| current_price / cost_basis - 1.0)
}
