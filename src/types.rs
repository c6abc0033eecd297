//! Core identifier type shared across the engine.

use std::fmt;

/// Asset identifier, stored inline as up to 8 ASCII bytes (zero-padded).
///
/// `Copy` and 8 bytes wide, so it can be passed around and used as a map key
/// without allocation. Tickers longer than 8 bytes are rejected at the
/// universe/registry boundary before a `Symbol` is ever constructed.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol {
    bytes: [u8; 8],
}

impl Symbol {
    /// Build a symbol from a ticker string.
    ///
    /// Input longer than 8 bytes is truncated; callers validate length first.
    pub fn new(ticker: &str) -> Self {
        debug_assert!(
            !ticker.is_empty() && ticker.len() <= 8,
            "ticker must be 1..=8 bytes, got {ticker:?}"
        );
        let mut bytes = [0u8; 8];
        let n = ticker.len().min(8);
        bytes[..n].copy_from_slice(&ticker.as_bytes()[..n]);
        Symbol { bytes }
    }

    /// The ticker as a string slice.
    pub fn as_str(&self) -> &str {
        let end = self.bytes.iter().position(|&b| b == 0).unwrap_or(8);
        std::str::from_utf8(&self.bytes[..end]).unwrap_or("?")
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.as_str())
    }
}

impl serde::Serialize for Symbol {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for Symbol {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s.is_empty() || s.len() > 8 {
            return Err(serde::de::Error::custom(format!(
                "symbol must be 1..=8 bytes, got {s:?}"
            )));
        }
        Ok(Symbol::new(&s))
    }
}
