//! Need calculation and the cash-constrained buy sizer.
//!
//! This is a greedy, single-pass proportional water-filling allocator, not an
//! optimizer: under-target assets bid for cash in proportion to how far below
//! target they sit, shares truncate to whole units, and truncation residue is
//! concentrated on the asset furthest from target.

use crate::types::Symbol;

/// Dollars still required to bring an asset to its target balance.
///
/// Target balance includes the margin facility; a non-positive portfolio
/// value produces `need = 0` rather than a division fault downstream.
pub fn need(weight: f64, current_balance: f64, portfolio_value: f64, margin_capacity: f64) -> f64 {
    if portfolio_value <= 0.0 {
        return 0.0;
    }
    weight * (portfolio_value + margin_capacity) - current_balance
}

/// Fraction of portfolio value a balance represents (0 when value is 0).
pub fn current_weight(current_balance: f64, portfolio_value: f64) -> f64 {
    if portfolio_value <= 0.0 {
        return 0.0;
    }
    current_balance / portfolio_value
}

/// One under- or over-target asset entering the buy sizer.
///
/// `price` is the buy-basis price (trailing moving average), which doubles as
/// the limit price on any resulting order. Callers exclude assets without a
/// usable price before sizing.
#[derive(Debug, Clone, Copy)]
pub struct BuyCandidate {
    pub symbol: Symbol,
    pub need: f64,
    pub price: f64,
}

/// A sized buy: whole shares at the buy-basis limit price.
#[derive(Debug, Clone, Copy)]
pub struct BuyOrder {
    pub symbol: Symbol,
    pub shares: i64,
    pub limit_price: f64,
    pub notional: f64,
}

/// Size whole-share buys for every candidate, constrained by `cash`.
///
/// Steps, in order: clamp needs at zero, scale proportionally when demand
/// exceeds cash (the scale factor never exceeds 1, so low demand is left
/// as-is rather than inflated), drop sub-`min_buy` amounts, truncate to
/// whole shares, then hand all truncation leftover to the largest-need
/// candidate and re-truncate it. The result always satisfies
/// `Σ notional <= cash`.
///
/// Returns one entry per candidate, zero-share entries included, in input
/// order.
pub fn size_buys(candidates: &[BuyCandidate], cash: f64, min_buy: f64) -> Vec<BuyOrder> {
    let cash = cash.max(0.0);
    let mut gets: Vec<f64> = candidates.iter().map(|c| c.need.max(0.0)).collect();

    let demand: f64 = gets.iter().sum();
    let mut divisor = if demand == 0.0 { 1.0 } else { demand };
    if divisor < cash {
        divisor = cash;
    }
    let scale = cash / divisor;

    for get in &mut gets {
        *get *= scale;
        if *get < min_buy {
            *get = 0.0;
        }
    }

    let mut orders: Vec<BuyOrder> = candidates
        .iter()
        .zip(&gets)
        .map(|(c, &get)| truncate(c, get))
        .collect();

    // Leftover redistribution happens only in the scaled-down branch; when
    // demand fits inside cash the spare cash stays idle rather than
    // over-buying the largest-need asset.
    if demand > cash {
        let committed: f64 = orders.iter().map(|o| o.notional).sum();
        let leftover = cash - committed;
        if let Some(idx) = largest_need(candidates) {
            let bumped = orders[idx].notional + leftover;
            orders[idx] = truncate(&candidates[idx], bumped);
        }
    }

    orders
}

/// Index of the candidate with the largest raw need (first wins ties).
fn largest_need(candidates: &[BuyCandidate]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, c) in candidates.iter().enumerate() {
        match best {
            Some((_, n)) if c.need <= n => {}
            _ => best = Some((i, c.need)),
        }
    }
    best.map(|(i, _)| i)
}

fn truncate(candidate: &BuyCandidate, get: f64) -> BuyOrder {
    debug_assert!(candidate.price > 0.0, "candidates must carry a usable price");
    let shares = (get / candidate.price).floor() as i64;
    BuyOrder {
        symbol: candidate.symbol,
        shares,
        limit_price: candidate.price,
        notional: shares as f64 * candidate.price,
    }
}

/// Mean of the trailing price observations, `None` when the series is empty
/// or carries a non-positive observation.
pub fn moving_average(history: &[f64]) -> Option<f64> {
    if history.is_empty() || history.iter().any(|p| *p <= 0.0) {
        return None;
    }
    Some(history.iter().sum::<f64>() / history.len() as f64)
}
