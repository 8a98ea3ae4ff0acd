use std::sync::Arc;

use futures::StreamExt;
use serde::Serialize;

use vendo_core::{BinRequest, GroupKey, VendMode, VendState};

use crate::events::{SessionEvent, SessionHandle};
use crate::factory::{self, WatchdogConfig};
use crate::recorder::{NoopRecorder, TransactionRecorder};
use crate::{DriverError, Result};

// ─── VendOptions ──────────────────────────────────────────────────────────

/// Configuration for one batch run.
pub struct VendOptions {
    /// How bins are partitioned into station groups.
    pub group_by: GroupKey,
    /// Watchdog overrides for the machines that carry one.
    pub watchdog: Option<WatchdogConfig>,
    /// Downstream transaction/audit recording.
    pub recorder: Arc<dyn TransactionRecorder>,
}

impl Default for VendOptions {
    fn default() -> Self {
        Self {
            group_by: GroupKey::default(),
            watchdog: None,
            recorder: Arc::new(NoopRecorder),
        }
    }
}

// ─── BatchSummary ─────────────────────────────────────────────────────────

/// Tallies for a completed batch. There is deliberately no aggregate
/// success flag: partial failure is the normal case, and callers inspect
/// per-bin state.
#[derive(Debug, Default, Serialize)]
pub struct BatchSummary {
    pub groups: usize,
    pub succeeded: usize,
    pub failed: usize,
}

// ─── run_batch ────────────────────────────────────────────────────────────

/// Drive every bin in the batch to a terminal state, one station group at a
/// time, and return once — returning is the batch's single completion
/// signal.
///
/// Groups never run concurrently: the next group is selected only after the
/// previous group's session has completed. A failing station does not stop
/// the others; the outcome is always a bin-by-bin record.
pub async fn run_batch(
    bins: &mut [BinRequest],
    mode: VendMode,
    options: &VendOptions,
) -> Result<BatchSummary> {
    let mut groups = 0;
    loop {
        let group = next_pending_group(bins, options.group_by);
        if group.is_empty() {
            break;
        }
        groups += 1;

        let anchor = &bins[group[0]];
        let station_name = anchor.station_name.clone();
        let station_address = anchor.station_address.clone();
        tracing::info!(station = %station_name, bins = group.len(), "dispatching station group");

        let machine = factory::resolve_station(&station_name, &station_address, options.watchdog)?;
        let group_bins: Vec<BinRequest> = group.iter().map(|&i| bins[i].clone()).collect();
        let session = match mode {
            VendMode::OpenDoor => return Err(DriverError::UnsupportedMode(mode)),
            VendMode::Issue => machine.vend_items(group_bins),
            VendMode::Return | VendMode::Stocking | VendMode::Physical => {
                machine.stock_items(group_bins)
            }
        };

        drive_group(bins, &group, session, mode, options.recorder.as_ref()).await;
    }

    Ok(BatchSummary {
        groups,
        succeeded: bins
            .iter()
            .filter(|b| b.state == VendState::Success)
            .count(),
        failed: bins
            .iter()
            .filter(|b| b.state == VendState::Failure)
            .count(),
    })
}

/// Consume one session's events and settle the group's bins.
///
/// Exposed as `pub(crate)` so tests can inject pre-built event sequences
/// without a real machine.
pub(crate) async fn drive_group(
    bins: &mut [BinRequest],
    group: &[usize],
    mut session: SessionHandle,
    mode: VendMode,
    recorder: &dyn TransactionRecorder,
) {
    while let Some(event) = session.next().await {
        match event {
            SessionEvent::Success { bin_ids } => {
                let settled = settle_bins(bins, &bin_ids, VendState::Success);
                recorder.record_success(&settled, mode);
            }
            SessionEvent::Failure { bin_ids, reason } => {
                let settled = settle_bins(bins, &bin_ids, VendState::Failure);
                tracing::warn!(%reason, bins = settled.len(), "bins failed");
                recorder.record_failure(&settled, &reason);
            }
            SessionEvent::UserHint(message) => {
                tracing::info!(%message, "operator instruction");
            }
            SessionEvent::Complete => break,
        }
    }

    // A session that completed while leaving bins Pending would be
    // re-dispatched against the same station forever. Fail the leftovers.
    let mut leftovers = Vec::new();
    for &i in group {
        if bins[i].is_pending() {
            bins[i].settle(VendState::Failure);
            leftovers.push(bins[i].clone());
        }
    }
    if !leftovers.is_empty() {
        let reason = "session ended without resolving these bins";
        tracing::warn!(bins = leftovers.len(), "{reason}");
        recorder.record_failure(&leftovers, reason);
    }
}

/// Indices of the first group of Pending bins sharing the grouping key.
fn next_pending_group(bins: &[BinRequest], key: GroupKey) -> Vec<usize> {
    let Some(first) = bins.iter().position(BinRequest::is_pending) else {
        return Vec::new();
    };
    let anchor = bins[first].clone();
    bins.iter()
        .enumerate()
        .filter(|(_, b)| b.is_pending() && same_group(&anchor, b, key))
        .map(|(i, _)| i)
        .collect()
}

fn same_group(a: &BinRequest, b: &BinRequest, key: GroupKey) -> bool {
    match key {
        GroupKey::StationName => a.station_name == b.station_name,
        GroupKey::StationId => a.station_id == b.station_id,
    }
}

fn settle_bins(bins: &mut [BinRequest], ids: &[i64], outcome: VendState) -> Vec<BinRequest> {
    let mut settled = Vec::new();
    for bin in bins.iter_mut() {
        if ids.contains(&bin.id) && bin.settle(outcome) {
            settled.push(bin.clone());
        }
    }
    settled
}

// ─── Tests ────────────────────────────────────────────────────────────────
