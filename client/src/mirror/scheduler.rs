use std::sync::Arc;

use log::{debug, error};
use solana_sdk::pubkey::Pubkey;
use tokio::sync::watch;
use tokio::time::{sleep, Duration, Instant};

use super::{DisplaySnapshot, LiveProjection, Mirror};
use crate::burn::{BurnCache, BurnOptions};
use crate::source::{HistorySource, LedgerSource};

/// Refresh loop that keeps `mirror` current until `shutdown` flips to true.
pub async fn mirror_loop<S: LedgerSource>(
    source: &S,
    mirror: &Mirror,
    owner: Pubkey,
    interval: Duration,
    reconcile_network_weight: bool,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        match mirror.refresh(source, &owner, reconcile_network_weight).await {
            Ok(true) => debug!("Mirror refresh committed"),
            Ok(false) => debug!("Mirror refresh superseded"),
            Err(e) => error!("Mirror refresh failed: {:?}", e),
        }

        if wait_or_shutdown(interval, &mut shutdown).await {
            debug!("Mirror loop stopped");
            return;
        }
    }
}

/// Periodic burn ledger rebuild through `cache`.
pub async fn burn_loop<S: HistorySource>(
    source: &S,
    cache: &BurnCache,
    program_id: Pubkey,
    options: BurnOptions,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        match cache.get_or_refresh(source, &program_id, &options).await {
            Ok(summary) => debug!(
                "Burn summary: {} days, {} burned, {} failed batches",
                summary.days.len(),
                summary.total_burned,
                summary.diagnostics.failed_batches
            ),
            Err(e) => error!("Burn aggregation failed: {:?}", e),
        }

        if wait_or_shutdown(interval, &mut shutdown).await {
            debug!("Burn loop stopped");
            return;
        }
    }
}

/// Publishes a projected [`DisplaySnapshot`] every `tick`, rebasing whenever
/// the mirror commits a newer snapshot.
pub async fn live_loop(
    mirror: &Mirror,
    tick: Duration,
    display: watch::Sender<Option<DisplaySnapshot>>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut live: Option<(LiveProjection, Instant)> = None;

    loop {
        if let Some(snapshot) = mirror.current().await {
            match live.as_mut() {
                Some((projection, _)) if Arc::ptr_eq(projection.snapshot(), &snapshot) => {}
                Some((projection, since)) => {
                    projection.rebase(snapshot);
                    *since = Instant::now();
                }
                None => live = Some((LiveProjection::new(snapshot), Instant::now())),
            }
        }

        if let Some((projection, since)) = live.as_mut() {
            let frame = projection.tick(since.elapsed().as_secs());
            display.send_replace(Some(frame));
        }

        if wait_or_shutdown(tick, &mut shutdown).await {
            return;
        }
    }
}

/// Sleeps for `interval`. Returns true if shutdown was requested meanwhile.
async fn wait_or_shutdown(interval: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    if *shutdown.borrow() {
        return true;
    }
    tokio::select! {
        _ = sleep(interval) => false,
        changed = shutdown.changed() => changed.is_err() || *shutdown.borrow(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_wait_returns_on_shutdown() {
        let (tx, mut rx) = watch::channel(false);

        assert!(!wait_or_shutdown(Duration::from_secs(5), &mut rx).await);

        tx.send_replace(true);
        assert!(wait_or_shutdown(Duration::from_secs(3_600), &mut rx).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_sender_stops_waiting() {
        let (tx, mut rx) = watch::channel(false);
        drop(tx);
        assert!(wait_or_shutdown(Duration::from_secs(3_600), &mut rx).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_loop_publishes_nothing_without_snapshot() {
        let mirror = Mirror::new();
        let (display_tx, display_rx) = watch::channel(None);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        shutdown_tx.send_replace(true);

        live_loop(&mirror, Duration::from_secs(1), display_tx, shutdown_rx).await;
        assert!(display_rx.borrow().is_none());
    }
}
