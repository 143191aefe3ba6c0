use std::collections::HashMap;

use solana_program::pubkey::Pubkey;

use crate::consts::BPS_DENOMINATOR;
use crate::state::{MinerPosition, ProtocolConfig};
use crate::tables::{level_bonus_bps, RigType};

/// Effective weight: buff first, then level, truncating after each step.
pub fn compose_weight(base: u64, buff_bps: u16, level_bps: u16) -> u64 {
    let buffed = buff_contribution(base, buff_bps) as u128 + base as u128;
    apply_level(buffed, level_bps)
}

/// Extra weight a buff adds on top of `base`.
pub fn buff_contribution(base: u64, buff_bps: u16) -> u64 {
    let extra = (base as u128) * (buff_bps as u128) / BPS_DENOMINATOR;
    u64::try_from(extra).unwrap_or(u64::MAX)
}

fn apply_level(buffed: u128, level_bps: u16) -> u64 {
    let weight = buffed * (BPS_DENOMINATOR + level_bps as u128) / BPS_DENOMINATOR;
    u64::try_from(weight).unwrap_or(u64::MAX)
}

/// Scale buff contributions down so their sum stays within `Σbase × cap_bps`.
///
/// Each contribution is reduced proportionally with floor rounding, so the
/// capped total never exceeds the limit.
pub fn apply_global_buff_cap(bases: &[u64], contributions: &mut [u64], cap_bps: u16) {
    let total_base: u128 = bases.iter().map(|b| *b as u128).sum();
    let limit = total_base * cap_bps as u128 / BPS_DENOMINATOR;
    let total: u128 = contributions.iter().map(|c| *c as u128).sum();

    if total <= limit {
        return;
    }

    for contribution in contributions.iter_mut() {
        let scaled = (*contribution as u128) * limit / total;
        *contribution = scaled as u64;
    }
}

/// A position with its weight layers resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComposedPosition {
    pub base: u64,
    pub rig: RigType,
    pub buff_bps: u16,
    /// Capped buff contribution already reflected in the stored reward debt.
    pub settled_contribution: u64,
    /// Capped contribution once a scheduled buff activates.
    pub scheduled_contribution: u64,
    /// Activation time of a scheduled buff that can still take effect.
    pub buff_boundary: Option<i64>,
    /// Weight written by the ledger at settlement; layers no longer apply.
    pub frozen_weight: Option<u64>,
}

impl ComposedPosition {
    pub fn buff_active(&self, now: i64) -> bool {
        self.buff_boundary.map_or(false, |boundary| now >= boundary)
    }

    /// Weight at an account level, with or without the scheduled buff.
    pub fn weight_at(&self, level: u8, with_scheduled: bool) -> u64 {
        if let Some(weight) = self.frozen_weight {
            return weight;
        }

        let contribution = if with_scheduled && self.buff_boundary.is_some() {
            self.scheduled_contribution
        } else {
            self.settled_contribution
        };

        apply_level(self.base as u128 + contribution as u128, level_bonus_bps(level))
    }

    /// Live weight at `now`.
    pub fn weight(&self, level: u8, now: i64) -> u64 {
        self.weight_at(level, self.buff_active(now))
    }
}

/// Resolve weight layers for one owner's positions.
///
/// The global buff cap applies across the whole set, so every position the
/// owner holds must be passed together. Output order matches input order.
pub fn compose_positions(
    positions: &[&MinerPosition],
    config: &ProtocolConfig,
    now: i64,
) -> Vec<ComposedPosition> {
    let day_length = config.day_length();

    let mut bases = Vec::with_capacity(positions.len());
    let mut settled = Vec::with_capacity(positions.len());
    let mut scheduled = Vec::with_capacity(positions.len());
    let mut layers = Vec::with_capacity(positions.len());

    for position in positions {
        let rig = position.rig(day_length);
        let buff_bps = rig.buff_bps(position.buff_level);
        let frozen = position.deactivated && position.hp_scaled;

        // A boundary at or past the contract end never takes effect.
        let boundary = (position.has_scheduled_buff() && position.buff_effective_ts < position.end_ts)
            .then_some(position.buff_effective_ts);

        let full = if frozen { 0 } else { buff_contribution(position.hp, buff_bps) };
        let current = match boundary {
            Some(ts) if now < ts => 0,
            _ if position.has_scheduled_buff() && boundary.is_none() => 0,
            _ => full,
        };

        bases.push(if frozen { 0 } else { position.hp });
        settled.push(current);
        scheduled.push(full);
        layers.push((rig, buff_bps, boundary, frozen));
    }

    apply_global_buff_cap(&bases, &mut settled, config.global_buff_cap_bps);
    apply_global_buff_cap(&bases, &mut scheduled, config.global_buff_cap_bps);

    positions
        .iter()
        .zip(layers)
        .enumerate()
        .map(|(i, (position, (rig, buff_bps, boundary, frozen)))| {
            // Before activation the scheduled buff is not part of the debt.
            let settled_contribution = if boundary.is_some() { 0 } else { settled[i] };
            ComposedPosition {
                base: position.hp,
                rig,
                buff_bps,
                settled_contribution,
                scheduled_contribution: scheduled[i],
                buff_boundary: boundary,
                frozen_weight: frozen.then_some(position.hp),
            }
        })
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WeightSource {
    /// The ledger's aggregate counter.
    Counter,
    /// Summed from composed weights of every active position.
    Reconstructed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NetworkWeight {
    pub value: u64,
    pub source: WeightSource,
}

impl NetworkWeight {
    pub fn counter(value: u64) -> Self {
        Self { value, source: WeightSource::Counter }
    }

    pub fn reconstructed(value: u64) -> Self {
        Self { value, source: WeightSource::Reconstructed }
    }
}

/// Whether the ledger counter can be trusted for the observed positions.
///
/// The counter lags settlement, so any observed position that has run past
/// its end without being deactivated marks it stale.
pub fn counter_is_stale<'a>(
    counter: u64,
    observed: impl IntoIterator<Item = &'a MinerPosition>,
    now: i64,
) -> bool {
    counter == 0 || observed.into_iter().any(|p| p.is_pending_settlement(now))
}

/// Sum of composed weights over all positions still accruing at `now`.
pub fn reconstruct_network_weight(
    positions: &[MinerPosition],
    levels: &HashMap<Pubkey, u8>,
    config: &ProtocolConfig,
    now: i64,
) -> u64 {
    let mut by_owner: HashMap<Pubkey, Vec<&MinerPosition>> = HashMap::new();
    for position in positions {
        if !position.deactivated && !position.has_ended(now) {
            by_owner.entry(position.owner).or_default().push(position);
        }
    }

    by_owner
        .iter()
        .map(|(owner, owned)| {
            let level = levels.get(owner).copied().unwrap_or(1);
            compose_positions(owned, config, now)
                .iter()
                .map(|c| c.weight(level, now) as u128)
                .sum::<u128>()
        })
        .sum::<u128>()
        .min(u64::MAX as u128) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::PositionVersion;

    fn reversed(base: u64, buff_bps: u16, level_bps: u16) -> u64 {
        let levelled = base as u128 * (10_000 + level_bps as u128) / 10_000;
        (levelled * (10_000 + buff_bps as u128) / 10_000) as u64
    }

    fn position(owner: Pubkey, hp: u64, rig: RigType, buff_level: u8) -> MinerPosition {
        MinerPosition {
            version: PositionVersion::V3,
            owner,
            hp,
            start_ts: 0,
            end_ts: 1_000,
            rig_type: Some(rig.into()),
            buff_level,
            ..Default::default()
        }
    }

    #[test]
    fn test_compose_buff_then_level() {
        assert_eq!(compose_weight(100, 1_000, 500), 115);
        assert_eq!(compose_weight(100, 0, 0), 100);
        assert_eq!(compose_weight(0, 1_500, 1_000), 0);
    }

    #[test]
    fn test_compose_order_pins() {
        // Truncation makes the order observable.
        assert_eq!(compose_weight(100, 300, 780), 111);
        assert_eq!(reversed(100, 300, 780), 110);
        assert_eq!(compose_weight(12, 1_000, 780), 14);
        assert_eq!(reversed(12, 1_000, 780), 13);
    }

    #[test]
    fn test_compose_saturates() {
        assert_eq!(compose_weight(u64::MAX, 1_500, 1_000), u64::MAX);
    }

    #[test]
    fn test_global_cap_scales_proportionally() {
        let bases = [100, 100];
        let mut contributions = [12, 12];
        apply_global_buff_cap(&bases, &mut contributions, 600);
        assert_eq!(contributions, [6, 6]);

        let mut uneven = [9, 3];
        apply_global_buff_cap(&bases, &mut uneven, 500);
        assert_eq!(uneven, [7, 2]);
        assert!(uneven.iter().sum::<u64>() <= 10);

        let mut under = [5, 5];
        apply_global_buff_cap(&bases, &mut under, 1_500);
        assert_eq!(under, [5, 5]);
    }

    #[test]
    fn test_compose_positions_with_cap() {
        let owner = Pubkey::new_unique();
        let a = position(owner, 100, RigType::Elite, 3);
        let b = position(owner, 100, RigType::Elite, 3);
        let config = ProtocolConfig { global_buff_cap_bps: 600, ..Default::default() };

        let composed = compose_positions(&[&a, &b], &config, 10);
        assert_eq!(composed[0].settled_contribution, 6);
        assert_eq!(composed[0].weight(1, 10), 106);
        assert_eq!(composed[1].weight(3, 10), 106 * 10_340 / 10_000);
    }

    #[test]
    fn test_scheduled_buff_contributes_nothing_until_boundary() {
        let owner = Pubkey::new_unique();
        let p = MinerPosition { buff_effective_ts: 500, ..position(owner, 100, RigType::Advanced, 1) };
        let config = ProtocolConfig::default();

        let composed = compose_positions(&[&p], &config, 400);
        assert_eq!(composed[0].buff_boundary, Some(500));
        assert_eq!(composed[0].weight(1, 400), 100);
        assert_eq!(composed[0].weight(1, 600), 103);
        assert_eq!(composed[0].weight_at(1, false), 100);
    }

    #[test]
    fn test_boundary_after_end_never_activates() {
        let owner = Pubkey::new_unique();
        let p = MinerPosition { buff_effective_ts: 1_000, ..position(owner, 100, RigType::Advanced, 1) };
        let composed = compose_positions(&[&p], &ProtocolConfig::default(), 2_000);
        assert_eq!(composed[0].buff_boundary, None);
        assert_eq!(composed[0].weight(1, 2_000), 100);
    }

    #[test]
    fn test_settled_weight_is_frozen() {
        let owner = Pubkey::new_unique();
        let p = MinerPosition { deactivated: true, hp_scaled: true, hp: 123, ..position(owner, 0, RigType::Elite, 3) };
        let composed = compose_positions(&[&p], &ProtocolConfig::default(), 0);
        assert_eq!(composed[0].weight(6, 0), 123);
    }

    #[test]
    fn test_counter_staleness() {
        let owner = Pubkey::new_unique();
        let live = position(owner, 10, RigType::Basic, 0);

        assert!(!counter_is_stale(50, [&live], 100));
        // Past its end and still active on the ledger.
        assert!(counter_is_stale(50, [&live], 1_000));
        assert!(counter_is_stale(0, std::iter::empty(), 100));

        let settled = MinerPosition { deactivated: true, ..live };
        assert!(!counter_is_stale(50, [&settled], 1_000));
    }

    #[test]
    fn test_reconstruct_skips_inactive() {
        let alice = Pubkey::new_unique();
        let bob = Pubkey::new_unique();
        let positions = vec![
            position(alice, 100, RigType::Advanced, 1),
            position(bob, 50, RigType::Basic, 0),
            MinerPosition { deactivated: true, ..position(bob, 1_000, RigType::Basic, 0) },
        ];
        let levels = HashMap::from([(alice, 2u8)]);

        let total = reconstruct_network_weight(&positions, &levels, &ProtocolConfig::default(), 10);
        assert_eq!(total, compose_weight(100, 300, 160) + 50);
        assert_eq!(reconstruct_network_weight(&positions, &levels, &ProtocolConfig::default(), 1_000), 0);
    }
}
