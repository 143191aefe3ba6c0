use std::sync::atomic::{AtomicU64, Ordering};

/// Tags refreshes so a slow result never replaces a newer one.
#[derive(Debug, Default)]
pub struct RefreshGeneration {
    started: AtomicU64,
    committed: AtomicU64,
}

impl RefreshGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a refresh and return its generation.
    pub fn begin(&self) -> u64 {
        self.started.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn latest_started(&self) -> u64 {
        self.started.load(Ordering::SeqCst)
    }

    pub fn latest_committed(&self) -> u64 {
        self.committed.load(Ordering::SeqCst)
    }

    /// Whether no newer refresh has started since `generation`.
    pub fn is_latest(&self, generation: u64) -> bool {
        generation == self.latest_started()
    }

    /// Record `generation` as applied, unless something newer was started or applied.
    pub fn try_commit(&self, generation: u64) -> bool {
        if !self.is_latest(generation) {
            return false;
        }
        self.committed
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |committed| {
                (generation > committed).then_some(generation)
            })
            .is_ok()
    }
}
