use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use vendo_core::{BinRequest, VendMode};

// ─── TransactionRecorder ──────────────────────────────────────────────────

/// Downstream recording of session outcomes: transactions for successful
/// bins, audit entries for failed ones.
///
/// Both calls are fire-and-forget. Implementations must swallow their own
/// errors (log and move on) — recording problems never influence the
/// orchestration outcome.
pub trait TransactionRecorder: Send + Sync {
    fn record_success(&self, bins: &[BinRequest], mode: VendMode);
    fn record_failure(&self, bins: &[BinRequest], reason: &str);
}

/// Discards everything. Tests and dry runs.
pub struct NoopRecorder;

impl TransactionRecorder for NoopRecorder {
    fn record_success(&self, _bins: &[BinRequest], _mode: VendMode) {}
    fn record_failure(&self, _bins: &[BinRequest], _reason: &str) {}
}

// ─── JsonlRecorder ────────────────────────────────────────────────────────

#[derive(Serialize)]
struct TransactionEntry<'a> {
    at: DateTime<Utc>,
    /// I = issued, R = returned, S = stocked, P = physical stock-in.
    code: &'a str,
    bin_id: i64,
    station_name: &'a str,
    virtual_code: &'a str,
    physical_code: &'a str,
    quantity: u32,
}

#[derive(Serialize)]
struct FailureEntry<'a> {
    at: DateTime<Utc>,
    bin_id: i64,
    station_name: &'a str,
    reason: &'a str,
}

/// Appends one JSON line per bin to `transactions.jsonl` / `failures.jsonl`
/// under the given directory, creating it on first write.
pub struct JsonlRecorder {
    dir: PathBuf,
}

impl JsonlRecorder {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn append(&self, file: &str, lines: &[String]) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let mut out = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(file))?;
        for line in lines {
            writeln!(out, "{line}")?;
        }
        Ok(())
    }
}

impl TransactionRecorder for JsonlRecorder {
    fn record_success(&self, bins: &[BinRequest], mode: VendMode) {
        let Some(code) = mode.transaction_code() else {
            return;
        };
        let now = Utc::now();
        let lines: Vec<String> = bins
            .iter()
            .filter_map(|bin| {
                serde_json::to_string(&TransactionEntry {
                    at: now,
                    code,
                    bin_id: bin.id,
                    station_name: &bin.station_name,
                    virtual_code: &bin.virtual_code,
                    physical_code: &bin.physical_code,
                    quantity: bin.quantity,
                })
                .ok()
            })
            .collect();
        if let Err(e) = self.append("transactions.jsonl", &lines) {
            tracing::warn!(error = %e, "could not record transactions");
        }
    }

    fn record_failure(&self, bins: &[BinRequest], reason: &str) {
        let now = Utc::now();
        let lines: Vec<String> = bins
            .iter()
            .filter_map(|bin| {
                serde_json::to_string(&FailureEntry {
                    at: now,
                    bin_id: bin.id,
                    station_name: &bin.station_name,
                    reason,
                })
                .ok()
            })
            .collect();
        if let Err(e) = self.append("failures.jsonl", &lines) {
            tracing::warn!(error = %e, "could not record failures");
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
