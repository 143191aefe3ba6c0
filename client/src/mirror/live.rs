use std::collections::HashMap;
use std::sync::Arc;

use mind_api::prelude::*;
use solana_sdk::pubkey::Pubkey;

use super::MirrorSnapshot;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PositionView {
    pub index: u64,
    pub address: Pubkey,
    pub rig: Option<RigType>,
    pub end_ts: Option<i64>,
    /// `None` when the account could not be read or decoded.
    pub reward: Option<PositionReward>,
}

/// What a display shows at one tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisplaySnapshot {
    pub generation: u64,
    pub now: i64,
    pub mining_acc: u128,
    pub mining_rate_per_second: u128,
    pub staking_acc: u128,
    pub network_weight: NetworkWeight,
    /// Live weight of the owner's accruing positions.
    pub owner_weight: u64,
    pub positions: Vec<PositionView>,
    pub total_pending_mind: u128,
    pub stake: Option<StakeReward>,
    pub level: Option<u8>,
    pub xp: Option<u64>,
    pub next_level: Option<(u8, u64)>,
}

/// Projects a committed snapshot forward between refreshes.
pub struct LiveProjection {
    snapshot: Arc<MirrorSnapshot>,
    mining: Accumulator,
    staking: Accumulator,
    /// Accumulator at `end_ts`, captured the first time a position is seen past its end.
    settlements: HashMap<Pubkey, u128>,
}

impl LiveProjection {
    pub fn new(snapshot: Arc<MirrorSnapshot>) -> Self {
        let mining = Accumulator::mining(&snapshot.config, snapshot.network_weight.value);
        let staking = Accumulator::staking(&snapshot.config);
        Self {
            snapshot,
            mining,
            staking,
            settlements: HashMap::new(),
        }
    }

    pub fn snapshot(&self) -> &Arc<MirrorSnapshot> {
        &self.snapshot
    }

    pub fn captured_settlement(&self, address: &Pubkey) -> Option<u128> {
        self.settlements.get(address).copied()
    }

    /// Switch to a newer snapshot. Captures survive only for positions the
    /// ledger still has not settled.
    pub fn rebase(&mut self, snapshot: Arc<MirrorSnapshot>) {
        let unsettled: Vec<Pubkey> = snapshot
            .positions
            .iter()
            .filter(|entry| entry.account.loaded().is_some_and(|p| !p.deactivated))
            .map(|entry| entry.address)
            .collect();
        self.settlements.retain(|address, _| unsettled.contains(address));

        self.mining = Accumulator::mining(&snapshot.config, snapshot.network_weight.value);
        self.staking = Accumulator::staking(&snapshot.config);
        self.snapshot = snapshot;
    }

    /// Recompute every figure `elapsed_secs` after the snapshot's ledger time.
    pub fn tick(&mut self, elapsed_secs: u64) -> DisplaySnapshot {
        let snapshot = Arc::clone(&self.snapshot);
        let base_ts = snapshot.ledger_time;
        let now = base_ts.saturating_add(elapsed_secs as i64);

        let profile = snapshot.profile.loaded();

        let loaded: Vec<&MinerPosition> = snapshot.loaded_positions().collect();
        let composed = compose_positions(&loaded, &snapshot.config, now);
        let mut composed = composed.iter();

        let mut positions = Vec::with_capacity(snapshot.positions.len());
        let mut owner_weight: u64 = 0;
        let mut total_pending: u128 = 0;

        for entry in &snapshot.positions {
            let Some(position) = entry.account.loaded() else {
                positions.push(PositionView {
                    index: entry.index,
                    address: entry.address,
                    rig: None,
                    end_ts: None,
                    reward: None,
                });
                continue;
            };
            let Some(layers) = composed.next() else {
                break;
            };

            let settlement = if position.is_pending_settlement(now) {
                let mining = &self.mining;
                Some(*self
                    .settlements
                    .entry(entry.address)
                    .or_insert_with(|| mining.settlement_at(position.end_ts)))
            } else {
                None
            };

            let reward = evaluate_position(position, layers, profile, &self.mining, now, settlement);
            if reward.status == PositionStatus::Active {
                owner_weight = owner_weight.saturating_add(reward.weight);
            }
            total_pending = total_pending.saturating_add(reward.pending);

            positions.push(PositionView {
                index: entry.index,
                address: entry.address,
                rig: Some(layers.rig),
                end_ts: Some(position.end_ts),
                reward: Some(reward),
            });
        }

        let badge_bonus_bps = profile.map_or(0, |p| p.badge_bonus_bps);
        let stake = snapshot
            .stake
            .loaded()
            .map(|stake| evaluate_stake(stake, &self.staking, badge_bonus_bps, now));

        let mining_base = self.mining.estimate_at(base_ts);
        let staking_base = self.staking.estimate_at(base_ts);

        DisplaySnapshot {
            generation: snapshot.generation,
            now,
            mining_acc: self.mining.project(mining_base, base_ts, elapsed_secs),
            mining_rate_per_second: self.mining.rate_per_second(),
            staking_acc: self.staking.project(staking_base, base_ts, elapsed_secs),
            network_weight: snapshot.network_weight,
            owner_weight,
            positions,
            total_pending_mind: total_pending,
            stake,
            level: profile.map(|p| p.level),
            xp: profile.map(|p| project_xp(p, now)),
            next_level: profile.and_then(|p| next_level(p.level)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::PositionEntry;
    use crate::utils::AccountState;

    const OWNER_SEED: u8 = 7;

    fn snapshot(positions: Vec<MinerPosition>) -> MirrorSnapshot {
        let owner = Pubkey::new_from_array([OWNER_SEED; 32]);
        let config = ProtocolConfig {
            emission_per_sec: 100,
            acc_mind_per_hp: 0,
            last_update_ts: 1_000,
            network_hp_active: 100,
            staking_reward_rate_xnt_per_sec: 10,
            staking_total_staked_mind: 1_000,
            staking_last_update_ts: 1_000,
            staking_epoch_end_ts: 1_500,
            ..Default::default()
        };
        let profile = MiningProfile {
            owner,
            next_position_index: positions.len() as u64,
            level: 1,
            active_hp: 10,
            last_xp_update_ts: 1_000,
            ..Default::default()
        };
        let stake = UserStake { owner, staked_mind: 500, ..Default::default() };

        let mut entries: Vec<PositionEntry> = positions
            .into_iter()
            .enumerate()
            .map(|(i, p)| PositionEntry {
                index: i as u64,
                address: position_pda(owner, i as u64).0,
                account: AccountState::Loaded(p),
            })
            .collect();
        entries.push(PositionEntry {
            index: entries.len() as u64,
            address: Pubkey::new_unique(),
            account: AccountState::Invalid(DecodeError::UnsupportedVersion { len: 99 }),
        });

        MirrorSnapshot {
            generation: 1,
            owner,
            slot: 42,
            ledger_time: 1_000,
            config,
            profile: AccountState::Loaded(profile),
            stake: AccountState::Loaded(stake),
            positions: entries,
            network_weight: NetworkWeight::counter(100),
        }
    }

    fn position(hp: u64, end_ts: i64) -> MinerPosition {
        MinerPosition {
            owner: Pubkey::new_from_array([OWNER_SEED; 32]),
            hp,
            start_ts: 0,
            end_ts,
            debt_level: Some(1),
            ..Default::default()
        }
    }

    #[test]
    fn test_tick_projects_forward() {
        let mut live = LiveProjection::new(Arc::new(snapshot(vec![position(10, 5_000)])));

        let first = live.tick(0);
        let later = live.tick(30);

        assert_eq!(first.total_pending_mind, 0);
        // 10 of 100 weight at 100 per second.
        assert_eq!(later.total_pending_mind, 300);
        assert_eq!(later.owner_weight, 10);
        assert_eq!(later.now, 1_030);
        assert!(later.mining_acc > first.mining_acc);
        assert_eq!(later.mining_rate_per_second, ACC_SCALE);
    }

    #[test]
    fn test_unavailable_account_degrades_one_entry() {
        let mut live = LiveProjection::new(Arc::new(snapshot(vec![position(10, 5_000)])));
        let display = live.tick(5);

        assert_eq!(display.positions.len(), 2);
        assert!(display.positions[0].reward.is_some());
        assert!(display.positions[1].reward.is_none());
    }

    #[test]
    fn test_expired_position_is_captured_once() {
        let mut live = LiveProjection::new(Arc::new(snapshot(vec![position(10, 1_010)])));
        let address = live.snapshot().positions[0].address;

        let at_end = live.tick(20);
        let captured = live.captured_settlement(&address).unwrap();
        assert_eq!(captured, 10 * ACC_SCALE);

        let much_later = live.tick(10_000);
        assert_eq!(live.captured_settlement(&address), Some(captured));
        assert_eq!(at_end.total_pending_mind, 100);
        assert_eq!(much_later.total_pending_mind, 100);
        assert_eq!(much_later.owner_weight, 0);
        assert_eq!(
            much_later.positions[0].reward.map(|r| r.status),
            Some(PositionStatus::PendingSettlement)
        );
    }

    #[test]
    fn test_capture_after_end_keeps_stored_accumulator() {
        // The accumulator was last written at 1000, long after the position ended.
        let mut expired = snapshot(vec![position(10, 500)]);
        expired.config.acc_mind_per_hp = 20 * ACC_SCALE;
        let mut live = LiveProjection::new(Arc::new(expired));
        let address = live.snapshot().positions[0].address;

        let display = live.tick(0);
        assert_eq!(live.captured_settlement(&address), Some(20 * ACC_SCALE));
        assert_eq!(display.total_pending_mind, 200);
        assert_eq!(live.tick(600).total_pending_mind, 200);
    }

    #[test]
    fn test_legacy_profile_shows_xp_reset() {
        let mut legacy = snapshot(vec![]);
        if let AccountState::Loaded(profile) = &mut legacy.profile {
            profile.level = 0;
            profile.xp = 900;
        }
        let mut live = LiveProjection::new(Arc::new(legacy));

        let display = live.tick(3_600);
        assert_eq!(display.level, Some(0));
        assert_eq!(display.xp, Some(0));
    }

    #[test]
    fn test_rebase_drops_settled_captures() {
        let mut live = LiveProjection::new(Arc::new(snapshot(vec![position(10, 1_010)])));
        let address = live.snapshot().positions[0].address;
        live.tick(20);
        assert!(live.captured_settlement(&address).is_some());

        let settled = MinerPosition {
            deactivated: true,
            hp_scaled: true,
            final_acc_mind_per_hp: 10 * ACC_SCALE,
            ..position(10, 1_010)
        };
        let mut next = snapshot(vec![settled]);
        next.generation = 2;
        live.rebase(Arc::new(next));

        assert_eq!(live.captured_settlement(&address), None);
        let display = live.tick(0);
        assert_eq!(display.generation, 2);
        assert_eq!(display.total_pending_mind, 100);
    }

    #[test]
    fn test_stake_and_xp_projection() {
        let mut live = LiveProjection::new(Arc::new(snapshot(vec![position(10, 5_000)])));

        let display = live.tick(3_600);
        // Epoch ends 500s after the snapshot: 10 per second shared by 1000 staked, 500 of it ours.
        assert_eq!(display.stake.map(|s| s.base), Some(2_500));
        assert_eq!(display.xp, Some(1));
        assert_eq!(display.level, Some(1));
        assert_eq!(display.next_level, Some((2, 1)));
    }
}
