//! JSONL audit trail.
//!
//! Each daily checkpoint appends events to an audit.jsonl file, one JSON
//! object per line, so a run can be reconstructed after the fact.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::allocation::BuyOrder;
use crate::error::Result;
use crate::registry::Registry;
use crate::report::DailyReport;
use crate::types::Symbol;

/// An audit event written to the JSONL trail.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub event: &'static str,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub data: serde_json::Value,
}

/// Append-only audit logger.
pub struct AuditLog {
    writer: BufWriter<std::fs::File>,
}

impl AuditLog {
    /// Open (or create) the audit log file for appending.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Log an event with arbitrary JSON data.
    pub fn log(&mut self, event: &'static str, data: serde_json::Value) -> Result<()> {
        let entry = AuditEvent {
            event,
            ts: Utc::now(),
            data,
        };
        let json = serde_json::to_string(&entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writeln!(self.writer, "{json}")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Log a simple event with no additional data.
    pub fn log_simple(&mut self, event: &'static str) -> Result<()> {
        self.log(event, serde_json::json!({}))
    }
}

/// Convenience: a checkpoint began.
pub fn log_checkpoint_started(audit: &mut AuditLog, checkpoint: &str) -> Result<()> {
    audit.log("checkpoint_started", serde_json::json!({ "checkpoint": checkpoint }))
}

/// Convenience: an orphan position was liquidated.
pub fn log_orphan_liquidated(audit: &mut AuditLog, symbol: Symbol, quantity: i64) -> Result<()> {
    audit.log(
        "orphan_liquidated",
        serde_json::json!({ "symbol": symbol.as_str(), "qty": quantity }),
    )
}

/// Convenience: a trim / harvest / defensive-trim decision was applied.
pub fn log_policy_action(
    audit: &mut AuditLog,
    event: &'static str,
    symbol: Symbol,
    unrealized_return: Option<f64>,
    detail: serde_json::Value,
) -> Result<()> {
    audit.log(
        event,
        serde_json::json!({
            "symbol": symbol.as_str(),
            "return": unrealized_return,
            "detail": detail,
        }),
    )
}

/// Convenience: buys were sized for the day.
pub fn log_buys_sized(audit: &mut AuditLog, orders: &[BuyOrder], cash: f64) -> Result<()> {
    let rows: Vec<_> = orders
        .iter()
        .map(|o| {
            serde_json::json!({
                "symbol": o.symbol.as_str(),
                "shares": o.shares,
                "limit": o.limit_price,
                "notional": o.notional,
            })
        })
        .collect();
    audit.log(
        "buys_sized",
        serde_json::json!({ "cash": cash, "orders": rows }),
    )
}

/// Convenience: a single buy order went out.
pub fn log_buy_submitted(audit: &mut AuditLog, order: &BuyOrder) -> Result<()> {
    audit.log(
        "buy_submitted",
        serde_json::json!({
            "symbol": order.symbol.as_str(),
            "shares": order.shares,
            "limit": order.limit_price,
        }),
    )
}

/// Convenience: the daily report was emitted.
pub fn log_report(audit: &mut AuditLog, report: &DailyReport) -> Result<()> {
    audit.log("report", serde_json::to_value(report)?)
}

/// Convenience: a checkpoint finished; records the registry as it stood.
pub fn log_checkpoint_completed(
    audit: &mut AuditLog,
    checkpoint: &str,
    registry: &Registry,
) -> Result<()> {
    let entries: Vec<_> = registry
        .iter()
        .map(|(symbol, e)| {
            serde_json::json!({
                "symbol": symbol.as_str(),
                "weight": e.weight,
                "substitute": e.substitute.map(|s| s.as_str().to_string()),
                "days_held": e.days_held,
            })
        })
        .collect();
    audit.log(
        "checkpoint_completed",
        serde_json::json!({ "checkpoint": checkpoint, "registry": entries }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audit_log_writes_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test_audit.jsonl");

        {
            let mut log = AuditLog::open(&path).unwrap();
            log.log_simple("test_event").unwrap();
            log.log("test_data", serde_json::json!({"key": "value"}))
                .unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        for line in &lines {
            let _: serde_json::Value = serde_json::from_str(line).unwrap();
        }

        assert!(lines[0].contains("\"event\":\"test_event\""));
    }

    #[test]
    fn audit_log_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subdir").join("deep").join("audit.jsonl");

        let mut log = AuditLog::open(&path).unwrap();
        log.log_simple("test").unwrap();

        assert!(path.exists());
    }

    #[test]
    fn policy_action_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");

        let mut log = AuditLog::open(&path).unwrap();
        log_policy_action(
            &mut log,
            "harvest",
            Symbol::new("VUG"),
            Some(-0.02),
            serde_json::json!({"substitute": "SPYG"}),
        )
        .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("\"event\":\"harvest\""));
        assert!(contents.contains("VUG"));
        assert!(contents.contains("SPYG"));
    }
}
