//! The allocation registry: per-asset target weight, designated substitute,
//! and days-held counter.
//!
//! The registry is the only durable state the engine owns. It is keyed by
//! asset identifier and keeps a stable iteration order (declaration order,
//! with a substitute taking over its principal's slot), which is what gives
//! the buy sizer its deterministic largest-need tie-break.

use std::path::Path;

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::Symbol;
use crate::universe::Universe;

/// Persistent per-asset state. Transient per-cycle values (need, buy-basis
/// price, shares) live in the cycle's own row structs, never here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssetEntry {
    /// Target fraction of total portfolio value (including margin facility).
    pub weight: f64,
    /// Asset to rotate into on a tax-loss harvest; `None` disables harvesting.
    pub substitute: Option<Symbol>,
    /// Consecutive days with a strictly positive held balance.
    pub days_held: u32,
}

/// Insertion-ordered mapping from asset identifier to its entry.
#[derive(Debug, Clone)]
pub struct Registry {
    entries: FxHashMap<Symbol, AssetEntry>,
    order: Vec<Symbol>,
}

/// On-disk form of the registry (entries in iteration order).
#[derive(Debug, Serialize, Deserialize)]
struct RegistryState {
    updated_at: DateTime<Utc>,
    entries: Vec<StateEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StateEntry {
    symbol: Symbol,
    weight: f64,
    #[serde(default)]
    substitute: Option<Symbol>,
    days_held: u32,
}

impl Registry {
    /// Build the initial registry from a validated universe; `days_held`
    /// starts at 0 for every asset.
    pub fn from_universe(universe: &Universe) -> Self {
        let mut registry = Registry {
            entries: FxHashMap::default(),
            order: Vec::with_capacity(universe.assets.len()),
        };
        for a in &universe.assets {
            let symbol = Symbol::new(&a.symbol);
            registry.entries.insert(
                symbol,
                AssetEntry {
                    weight: a.weight,
                    substitute: a.substitute.as_deref().map(Symbol::new),
                    days_held: 0,
                },
            );
            registry.order.push(symbol);
        }
        registry
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, symbol: Symbol) -> bool {
        self.entries.contains_key(&symbol)
    }

    pub fn get(&self, symbol: Symbol) -> Option<&AssetEntry> {
        self.entries.get(&symbol)
    }

    pub fn get_mut(&mut self, symbol: Symbol) -> Option<&mut AssetEntry> {
        self.entries.get_mut(&symbol)
    }

    /// Active symbols in registry order.
    pub fn symbols(&self) -> Vec<Symbol> {
        self.order.clone()
    }

    /// Entries in registry order.
    pub fn iter(&self) -> impl Iterator<Item = (Symbol, &AssetEntry)> {
        self.order.iter().map(|s| (*s, &self.entries[s]))
    }

    /// Replace `principal` with its designated substitute.
    ///
    /// The new entry inherits the principal's weight, starts at
    /// `days_held = 0`, takes over the principal's slot in iteration order,
    /// and records the principal as its own substitute so the rotation can
    /// reverse later. Returns the substitute's symbol.
    ///
    /// The registry is left untouched on error, so callers can submit the
    /// liquidation order first and only mutate on success.
    pub fn apply_substitution(&mut self, principal: Symbol) -> Result<Symbol> {
        let entry = self
            .entries
            .get(&principal)
            .copied()
            .ok_or_else(|| Error::State(format!("{principal} is not an active asset")))?;
        let substitute = entry
            .substitute
            .ok_or_else(|| Error::State(format!("{principal} has no designated substitute")))?;
        if self.entries.contains_key(&substitute) {
            return Err(Error::State(format!(
                "substitute {substitute} for {principal} is already active"
            )));
        }

        self.entries.remove(&principal);
        self.entries.insert(
            substitute,
            AssetEntry {
                weight: entry.weight,
                substitute: Some(principal),
                days_held: 0,
            },
        );
        let slot = self
            .order
            .iter()
            .position(|s| *s == principal)
            .expect("order vec tracks entry keys");
        self.order[slot] = substitute;
        Ok(substitute)
    }

    /// Load the registry from its JSON state file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::StateRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let state: RegistryState = serde_json::from_str(&contents)?;

        let mut registry = Registry {
            entries: FxHashMap::default(),
            order: Vec::with_capacity(state.entries.len()),
        };
        for e in state.entries {
            if registry.entries.contains_key(&e.symbol) {
                return Err(Error::State(format!("duplicate entry: {}", e.symbol)));
            }
            registry.entries.insert(
                e.symbol,
                AssetEntry {
                    weight: e.weight,
                    substitute: e.substitute,
                    days_held: e.days_held,
                },
            );
            registry.order.push(e.symbol);
        }
        if registry.is_empty() {
            return Err(Error::State("state file holds no entries".into()));
        }
        for (sym, entry) in registry.iter() {
            if let Some(sub) = entry.substitute {
                if registry.contains(sub) {
                    return Err(Error::State(format!(
                        "substitute {sub} for {sym} is also an active asset"
                    )));
                }
            }
        }
        Ok(registry)
    }

    /// Persist the registry, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let state = RegistryState {
            updated_at: Utc::now(),
            entries: self
                .iter()
                .map(|(symbol, e)| StateEntry {
                    symbol,
                    weight: e.weight,
                    substitute: e.substitute,
                    days_held: e.days_held,
                })
                .collect(),
        };
        let json = serde_json::to_string_pretty(&state)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

impl std::fmt::Display for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "  {:8} {:>8} {:>10} {:8}",
            "Symbol", "Weight", "Days Held", "Substitute"
        )?;
        for (symbol, e) in self.iter() {
            writeln!(
                f,
                "  {:8} {:>7.2}% {:>10} {:8}",
                symbol,
                e.weight * 100.0,
                e.days_held,
                e.substitute.map(|s| s.as_str().to_string()).unwrap_or_else(|| "-".into()),
            )?;
        }
        Ok(())
    }
}
