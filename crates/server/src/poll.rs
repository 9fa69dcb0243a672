//! Background reconciliation pass.
//!
//! Re-runs the catalog join on an interval and reports drift between the
//! provider and the metadata store. The pass only reads; repairing drift is
//! left to operators. It updates the orphan gauge but not the counters of
//! catalogs served to clients.

use crate::reconcile;
use crate::state::AppState;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Run one reconciliation pass and log its outcome.
pub async fn run_pass(state: &AppState) {
    match reconcile::list_datasets(
        state.provider.as_ref(),
        state.metadata.as_ref(),
        &state.config.catalog,
    )
    .await
    {
        Ok(result) => {
            tracing::info!(
                datasets = result.descriptors.len(),
                fallback = result.fallback_count(),
                orphaned = result.orphaned.len(),
                "Reconciliation pass complete"
            );
            for key in &result.orphaned {
                tracing::warn!(
                    sheet_id = %key.sheet_id,
                    database_name = %key.database_name,
                    "Metadata record has no matching tab"
                );
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Reconciliation pass failed");
        }
    }
}

/// Spawn the periodic reconciliation task. The first pass runs at once.
pub fn spawn_reconcile_task(state: AppState, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            run_pass(&state).await;
        }
    })
}
