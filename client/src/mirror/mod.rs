mod generation;
mod live;
mod scheduler;
mod snapshot;

pub use generation::*;
pub use live::*;
pub use scheduler::*;
pub use snapshot::*;

use std::sync::Arc;

use anyhow::Result;
use log::debug;
use solana_sdk::pubkey::Pubkey;
use tokio::sync::RwLock;

use crate::source::LedgerSource;

/// The latest committed snapshot for one owner.
#[derive(Default)]
pub struct Mirror {
    generation: RefreshGeneration,
    current: RwLock<Option<Arc<MirrorSnapshot>>>,
}

impl Mirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_refresh(&self) -> u64 {
        self.generation.begin()
    }

    /// Store `snapshot` if it belongs to the newest refresh. Returns whether it was applied.
    pub async fn commit(&self, snapshot: MirrorSnapshot) -> bool {
        let mut current = self.current.write().await;
        if !self.generation.try_commit(snapshot.generation) {
            debug!(
                "Discarding snapshot {} (latest started {})",
                snapshot.generation,
                self.generation.latest_started()
            );
            return false;
        }
        *current = Some(Arc::new(snapshot));
        true
    }

    pub async fn current(&self) -> Option<Arc<MirrorSnapshot>> {
        self.current.read().await.clone()
    }

    /// Fetch and commit a fresh snapshot. `Ok(false)` means a newer refresh won.
    pub async fn refresh<S: LedgerSource>(&self, source: &S, owner: &Pubkey, reconcile_network_weight: bool) -> Result<bool> {
        let generation = self.begin_refresh();
        let snapshot = fetch_snapshot(source, owner, generation, reconcile_network_weight).await?;
        Ok(self.commit(snapshot).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::AccountState;
    use mind_api::prelude::*;

    fn empty_snapshot(generation: u64) -> MirrorSnapshot {
        MirrorSnapshot {
            generation,
            owner: Pubkey::default(),
            slot: generation,
            ledger_time: 0,
            config: ProtocolConfig::default(),
            profile: AccountState::Missing,
            stake: AccountState::Missing,
            positions: Vec::new(),
            network_weight: NetworkWeight::counter(0),
        }
    }

    #[tokio::test]
    async fn test_slow_refresh_is_discarded() {
        let mirror = Mirror::new();
        let slow = mirror.begin_refresh();
        let fast = mirror.begin_refresh();

        assert!(mirror.commit(empty_snapshot(fast)).await);
        assert!(!mirror.commit(empty_snapshot(slow)).await);

        let current = mirror.current().await.unwrap();
        assert_eq!(current.generation, fast);
    }

    #[tokio::test]
    async fn test_nothing_committed_initially() {
        let mirror = Mirror::new();
        assert!(mirror.current().await.is_none());
    }
}
