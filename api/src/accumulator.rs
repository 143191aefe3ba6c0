use log::warn;

use crate::compose::ComposedPosition;
use crate::consts::*;
use crate::state::{MinerPosition, MiningProfile, ProtocolConfig, UserStake};

/// A reward-per-unit accumulator, scaled by [`ACC_SCALE`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Accumulator {
    pub acc: u128,
    pub last_update_ts: i64,
    /// Reward emitted per second across the whole pool.
    pub rate: u64,
    /// Total weight sharing the rate.
    pub total: u64,
    /// Accrual stops here, if set.
    pub end_ts: Option<i64>,
}

impl Accumulator {
    pub fn mining(config: &ProtocolConfig, network_weight: u64) -> Self {
        Self {
            acc: config.acc_mind_per_hp,
            last_update_ts: config.last_update_ts,
            rate: config.emission_per_sec,
            total: network_weight,
            end_ts: None,
        }
    }

    pub fn staking(config: &ProtocolConfig) -> Self {
        Self {
            acc: config.staking_acc_xnt_per_mind,
            last_update_ts: config.staking_last_update_ts,
            rate: config.staking_reward_rate_xnt_per_sec,
            total: config.staking_total_staked_mind,
            end_ts: Some(config.staking_epoch_end_ts),
        }
    }

    /// Accumulator growth per second. Zero when nothing shares the pool.
    pub fn rate_per_second(&self) -> u128 {
        if self.total == 0 {
            return 0;
        }
        (self.rate as u128) * ACC_SCALE / (self.total as u128)
    }

    fn clamp_to_end(&self, ts: i64) -> i64 {
        match self.end_ts {
            Some(end) => ts.min(end),
            None => ts,
        }
    }

    /// Advance exactly as the ledger does on its next write.
    pub fn advance_to(&self, now: i64) -> Self {
        if now <= self.last_update_ts {
            return *self;
        }
        if self.rate == 0 || self.total == 0 {
            return Self { last_update_ts: now, ..*self };
        }

        let effective_end = self.clamp_to_end(now);
        if effective_end <= self.last_update_ts {
            return *self;
        }

        let dt = (effective_end - self.last_update_ts) as u128;
        let delta = dt
            .saturating_mul(self.rate as u128)
            .saturating_mul(ACC_SCALE)
            / self.total as u128;

        Self {
            acc: self.acc.saturating_add(delta),
            last_update_ts: effective_end,
            ..*self
        }
    }

    /// Estimate the accumulator at any instant from the stored value.
    ///
    /// Accrual only happens before the epoch end, in both directions, so an
    /// estimate at or after `last_update_ts` never drops below `acc`.
    /// Backward estimates saturate at zero.
    pub fn estimate_at(&self, ts: i64) -> u128 {
        let rate = self.rate_per_second();
        let last = self.clamp_to_end(self.last_update_ts);
        let ts = self.clamp_to_end(ts);

        if ts >= self.last_update_ts {
            let elapsed = (ts - self.last_update_ts) as u128;
            self.acc.saturating_add(rate.saturating_mul(elapsed))
        } else if ts >= last {
            self.acc
        } else {
            let elapsed = (last - ts) as u128;
            self.acc.saturating_sub(rate.saturating_mul(elapsed))
        }
    }

    /// Accumulator a position ending at `end_ts` settles against.
    ///
    /// Once the stored value was written at or after the end it is the value
    /// the ledger freezes, so it is returned unchanged.
    pub fn settlement_at(&self, end_ts: i64) -> u128 {
        if self.last_update_ts >= end_ts {
            self.acc
        } else {
            self.estimate_at(end_ts)
        }
    }

    /// Project forward `elapsed` seconds from `from`, the instant `stored` was observed.
    pub fn project(&self, stored: u128, from: i64, elapsed: u64) -> u128 {
        let to = self.clamp_to_end(from.saturating_add(elapsed as i64));
        let elapsed = to.saturating_sub(from).max(0) as u128;
        stored.saturating_add(self.rate_per_second().saturating_mul(elapsed))
    }
}

/// `weight × acc / SCALE − debt`, clamped at zero.
pub fn pending(weight: u64, acc: u128, debt: u128) -> u128 {
    let earned = (weight as u128).saturating_mul(acc) / ACC_SCALE;
    if earned < debt {
        if cfg!(debug_assertions) {
            warn!(
                "Model invariant violation: debt {} exceeds earned {} (weight {}, acc {})",
                debt, earned, weight, acc
            );
        }
        return 0;
    }
    earned - debt
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PositionStatus {
    Active,
    /// Ran past its end; the ledger has not settled it yet.
    PendingSettlement,
    Settled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PositionReward {
    pub status: PositionStatus,
    pub weight: u64,
    /// Accumulator the reward was evaluated against.
    pub acc: u128,
    /// Debt after level and buff adjustments.
    pub debt: u128,
    pub pending: u128,
}

/// Evaluate a position's unclaimed emission at `now`.
///
/// `settlement_acc` is the accumulator captured at `end_ts` the first time the
/// position was seen past its end; when present it is used as is.
pub fn evaluate_position(
    position: &MinerPosition,
    composed: &ComposedPosition,
    profile: Option<&MiningProfile>,
    mining: &Accumulator,
    now: i64,
    settlement_acc: Option<u128>,
) -> PositionReward {
    let level = profile.map_or(1, |p| p.level);

    if position.deactivated {
        let weight = composed.weight(level, position.end_ts);
        let acc = position.final_acc_mind_per_hp;
        return PositionReward {
            status: PositionStatus::Settled,
            weight,
            acc,
            debt: position.reward_debt,
            pending: pending(weight, acc, position.reward_debt),
        };
    }

    let (status, eval_ts, acc) = if position.has_ended(now) {
        let acc = settlement_acc.unwrap_or_else(|| mining.settlement_at(position.end_ts));
        (PositionStatus::PendingSettlement, position.end_ts, acc)
    } else {
        (PositionStatus::Active, now, mining.estimate_at(now))
    };

    let mut debt = position.reward_debt;

    // Levels gained since the debt was recorded.
    let debt_level = position.debt_level.unwrap_or(level);
    for l in debt_level.saturating_add(1)..=level {
        let delta = composed.weight_at(l, false).saturating_sub(composed.weight_at(l - 1, false));
        let snapshot = profile.and_then(|p| p.level_snapshot(l)).unwrap_or(acc);
        debt = debt.saturating_add((delta as u128).saturating_mul(snapshot) / ACC_SCALE);
    }

    let weight = if let Some(boundary) = composed.buff_boundary.filter(|_| composed.buff_active(eval_ts)) {
        let old = composed.weight_at(level, false);
        let new = composed.weight_at(level, true);
        let at_boundary = mining.estimate_at(boundary).min(acc);
        debt = debt.saturating_add((new.saturating_sub(old) as u128).saturating_mul(at_boundary) / ACC_SCALE);
        new
    } else {
        composed.weight_at(level, false)
    };

    PositionReward {
        status,
        weight,
        acc,
        debt,
        pending: pending(weight, acc, debt),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StakeReward {
    /// Owed plus accrued, before bonuses.
    pub base: u128,
    pub payout: u128,
}

/// Staking reward claimable at `now`, badge bonus first, then the XP boost.
pub fn evaluate_stake(stake: &UserStake, staking: &Accumulator, badge_bonus_bps: u16, now: i64) -> StakeReward {
    let acc = staking.estimate_at(now);
    let base = (stake.reward_owed as u128).saturating_add(pending(stake.staked_mind, acc, stake.reward_debt));

    let badge = badge_bonus_bps.min(BADGE_BONUS_CAP_BPS) as u128;
    let with_badge = base.saturating_mul(BPS_DENOMINATOR + badge) / BPS_DENOMINATOR;
    let payout = with_badge.saturating_mul(BPS_DENOMINATOR + stake.xp_boost_bps as u128) / BPS_DENOMINATOR;

    StakeReward { base, payout }
}

/// XP the ledger will credit on the profile's next update.
pub fn project_xp(profile: &MiningProfile, now: i64) -> u64 {
    // Legacy profiles restart from zero XP on their next update.
    if profile.level == 0 {
        return 0;
    }
    if profile.last_xp_update_ts <= 0 || now <= profile.last_xp_update_ts {
        return profile.xp;
    }
    let dt = (now - profile.last_xp_update_ts) as u128;
    let gained = (profile.active_hp as u128).saturating_mul(dt) / XP_SECONDS_PER_POINT as u128;
    profile.xp.saturating_add(u64::try_from(gained).unwrap_or(u64::MAX))
}
