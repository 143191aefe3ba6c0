use std::sync::atomic::{AtomicU64, Ordering};

use log::debug;
use solana_sdk::pubkey::Pubkey;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

use super::{aggregate_burns, BurnOptions, BurnSummary};
use crate::error::AggregationError;
use crate::source::HistorySource;

struct CachedSummary {
    value: BurnSummary,
    fetched_at: Instant,
}

/// Holds the latest burn summary for `ttl`.
///
/// The lock is held for the whole history walk, so callers arriving while a
/// walk is in flight wait for it and share its result.
pub struct BurnCache {
    ttl: Duration,
    slot: Mutex<Option<CachedSummary>>,
    walks: AtomicU64,
}

impl BurnCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
            walks: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of history walks performed so far.
    pub fn walks(&self) -> u64 {
        self.walks.load(Ordering::SeqCst)
    }

    /// Cached summary if still fresh, otherwise a new walk.
    ///
    /// A failed walk leaves the previous value in place.
    pub async fn get_or_refresh<S: HistorySource>(
        &self,
        source: &S,
        program_id: &Pubkey,
        options: &BurnOptions,
    ) -> Result<BurnSummary, AggregationError> {
        let mut slot = self.slot.lock().await;

        if let Some(cached) = slot.as_ref() {
            if cached.fetched_at.elapsed() < self.ttl {
                debug!("Burn cache hit, age {:?}", cached.fetched_at.elapsed());
                return Ok(cached.value.clone());
            }
        }

        self.walks.fetch_add(1, Ordering::SeqCst);
        let value = aggregate_burns(source, program_id, options).await?;

        *slot = Some(CachedSummary {
            value: value.clone(),
            fetched_at: Instant::now(),
        });

        Ok(value)
    }

    /// Last stored summary regardless of age.
    pub async fn peek(&self) -> Option<BurnSummary> {
        self.slot.lock().await.as_ref().map(|cached| cached.value.clone())
    }

    pub async fn invalidate(&self) {
        *self.slot.lock().await = None;
    }
}
