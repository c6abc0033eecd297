//! Basket universe specification (universe.json) loading and validation.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::types::Symbol;

/// How far the weight sum may drift from 1.0 before we call it a
/// configuration error. The historical basket sums to 0.99, so exact
/// equality is deliberately not required.
pub const WEIGHT_SUM_TOLERANCE: f64 = 0.05;

/// The initial basket: principal assets, target weights, and optional
/// designated substitutes for tax-loss harvesting.
#[derive(Debug, Clone, Deserialize)]
pub struct Universe {
    pub assets: Vec<UniverseEntry>,
}

/// A single principal asset in the basket.
#[derive(Debug, Clone, Deserialize)]
pub struct UniverseEntry {
    pub symbol: String,
    pub weight: f64,
    #[serde(default)]
    pub substitute: Option<String>,
}

impl Universe {
    /// Load and validate a universe.json file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::UniverseRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let universe: Universe = serde_json::from_str(&contents)?;
        universe.validate()?;
        Ok(universe)
    }

    /// Parse from a JSON string (useful for testing).
    pub fn from_json(json: &str) -> Result<Self> {
        let universe: Universe = serde_json::from_str(json)?;
        universe.validate()?;
        Ok(universe)
    }

    /// Validate the basket specification.
    fn validate(&self) -> Result<()> {
        if self.assets.is_empty() {
            return Err(Error::Universe("asset list is empty".into()));
        }

        let mut active = HashSet::new();
        for a in &self.assets {
            check_ticker(&a.symbol)?;
            if !active.insert(a.symbol.as_str()) {
                return Err(Error::Universe(format!("duplicate symbol: {}", a.symbol)));
            }
        }

        for a in &self.assets {
            if a.weight <= 0.0 || a.weight > 1.0 {
                return Err(Error::Universe(format!(
                    "weight for {} ({}) must be in (0.0, 1.0]",
                    a.symbol, a.weight
                )));
            }
        }

        // Substitutes must be a disjoint, duplicate-free set: a substitute
        // becomes active only by replacing its principal.
        let mut subs = HashSet::new();
        for a in &self.assets {
            if let Some(ref sub) = a.substitute {
                check_ticker(sub)?;
                if sub == &a.symbol {
                    return Err(Error::Universe(format!(
                        "{} designates itself as its substitute",
                        a.symbol
                    )));
                }
                if active.contains(sub.as_str()) {
                    return Err(Error::Universe(format!(
                        "substitute {} for {} is already an active asset",
                        sub, a.symbol
                    )));
                }
                if !subs.insert(sub.as_str()) {
                    return Err(Error::Universe(format!(
                        "substitute {sub} is designated by more than one asset"
                    )));
                }
            }
        }

        let sum: f64 = self.assets.iter().map(|a| a.weight).sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(Error::Universe(format!(
                "weights sum to {sum:.4}, expected within {WEIGHT_SUM_TOLERANCE} of 1.0"
            )));
        }

        Ok(())
    }

    /// Active symbols, in declaration order.
    pub fn symbols(&self) -> Vec<Symbol> {
        self.assets.iter().map(|a| Symbol::new(&a.symbol)).collect()
    }
}

fn check_ticker(ticker: &str) -> Result<()> {
    if ticker.is_empty() {
        return Err(Error::Universe("empty symbol".into()));
    }
    if ticker.len() > 8 {
        return Err(Error::Universe(format!("symbol '{ticker}' exceeds 8 bytes")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_json() -> &'static str {
        r#"{
            "assets": [
                { "symbol": "VUG",  "weight": 0.40, "substitute": "SPYG" },
                { "symbol": "VTV",  "weight": 0.30, "substitute": "SPYV" },
                { "symbol": "BLV",  "weight": 0.30 }
            ]
        }"#
    }

    #[test]
    fn parse_valid_universe() {
        let u = Universe::from_json(valid_json()).unwrap();
        assert_eq!(u.assets.len(), 3);
        assert_eq!(u.assets[0].symbol, "VUG");
        assert_eq!(u.assets[0].substitute.as_deref(), Some("SPYG"));
        assert!(u.assets[2].substitute.is_none());
    }

    #[test]
    fn symbols_in_declaration_order() {
        let u = Universe::from_json(valid_json()).unwrap();
        let syms = u.symbols();
        assert_eq!(syms[0].as_str(), "VUG");
        assert_eq!(syms[2].as_str(), "BLV");
    }

    #[test]
    fn reject_empty_assets() {
        assert!(Universe::from_json(r#"{"assets":[]}"#).is_err());
    }

    #[test]
    fn reject_duplicate_symbols() {
        let json = r#"{
            "assets": [
                { "symbol": "VUG", "weight": 0.5 },
                { "symbol": "VUG", "weight": 0.5 }
            ]
        }"#;
        assert!(Universe::from_json(json).is_err());
    }

    #[test]
    fn reject_long_symbol() {
        let json = r#"{"assets":[{ "symbol": "TOOLONGNAME", "weight": 1.0 }]}"#;
        assert!(Universe::from_json(json).is_err());
    }

    #[test]
    fn reject_zero_weight() {
        let json = r#"{"assets":[{ "symbol": "VUG", "weight": 0.0 }]}"#;
        assert!(Universe::from_json(json).is_err());
    }

    #[test]
    fn reject_weight_sum_far_from_one() {
        let json = r#"{
            "assets": [
                { "symbol": "VUG", "weight": 0.40 },
                { "symbol": "VTV", "weight": 0.40 }
            ]
        }"#;
        assert!(Universe::from_json(json).is_err());
    }

    #[test]
    fn accept_historical_sum_of_099() {
        let json = r#"{
            "assets": [
                { "symbol": "VUG", "weight": 0.50 },
                { "symbol": "VTV", "weight": 0.49 }
            ]
        }"#;
        assert!(Universe::from_json(json).is_ok());
    }

    #[test]
    fn reject_substitute_already_active() {
        let json = r#"{
            "assets": [
                { "symbol": "VUG", "weight": 0.5, "substitute": "VTV" },
                { "symbol": "VTV", "weight": 0.5 }
            ]
        }"#;
        assert!(Universe::from_json(json).is_err());
    }

    #[test]
    fn reject_self_substitute() {
        let json = r#"{"assets":[{ "symbol": "VUG", "weight": 1.0, "substitute": "VUG" }]}"#;
        assert!(Universe::from_json(json).is_err());
    }

    #[test]
    fn reject_shared_substitute() {
        let json = r#"{
            "assets": [
                { "symbol": "VUG", "weight": 0.5, "substitute": "SPYG" },
                { "symbol": "VTV", "weight": 0.5, "substitute": "SPYG" }
            ]
        }"#;
        assert!(Universe::from_json(json).is_err());
    }
}
