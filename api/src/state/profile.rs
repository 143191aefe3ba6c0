use std::mem::size_of;

use bytemuck::{Pod, Zeroable};
use solana_program::pubkey::Pubkey;

use crate::consts::{DISCRIMINATOR_LEN, MAX_LEVEL};
use crate::decode::{cast_body, VersionedAccount};
use crate::error::DecodeError;

pub const MINING_PROFILE_V1_LEN: usize = DISCRIMINATOR_LEN + size_of::<MiningProfileV1>();
pub const MINING_PROFILE_V2_LEN: usize = DISCRIMINATOR_LEN + size_of::<MiningProfileV2>();
pub const MINING_PROFILE_V3_LEN: usize = DISCRIMINATOR_LEN + size_of::<MiningProfileV3>();
pub const MINING_PROFILE_V4_LEN: usize = DISCRIMINATOR_LEN + size_of::<MiningProfileV4>();

pub const LEVEL_SNAPSHOT_COUNT: usize = MAX_LEVEL as usize;

#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct MiningProfileV1 {
    pub owner: Pubkey,
    pub next_position_index: u64,
    pub active_hp: u64,
    pub xp: u64,
    pub badge_tier: u8,
    pub badge_bonus_bps: u16,
    pub bump: u8,
}

#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct MiningProfileV2 {
    pub v1: MiningProfileV1,
    pub level: u8,
    pub last_xp_update_ts: i64,
}

#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct MiningProfileV3 {
    pub v2: MiningProfileV2,
    pub level_acc_snapshots: [u128; LEVEL_SNAPSHOT_COUNT],
}

#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct MiningProfileV4 {
    pub v3: MiningProfileV3,
    pub active_effective_hp: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProfileVersion {
    V1,
    /// Adds `level` and `last_xp_update_ts`.
    V2,
    /// Adds the per-level accumulator snapshots.
    V3,
    /// Adds `active_effective_hp`.
    V4,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MiningProfile {
    pub version: ProfileVersion,

    pub owner: Pubkey,
    pub next_position_index: u64,
    pub active_hp: u64,
    pub xp: u64,
    pub badge_tier: u8,
    pub badge_bonus_bps: u16,
    pub bump: u8,
    /// 0 on legacy profiles; the ledger resets their XP and moves them to 1 on the next update.
    pub level: u8,
    pub last_xp_update_ts: i64,
    /// `[l - 1]` holds the mining accumulator when level `l` was reached, 0 when unrecorded.
    pub level_acc_snapshots: Option<[u128; LEVEL_SNAPSHOT_COUNT]>,
    pub active_effective_hp: Option<u64>,
}

impl MiningProfile {
    /// Accumulator recorded when `level` was reached.
    pub fn level_snapshot(&self, level: u8) -> Option<u128> {
        let index = (level as usize).checked_sub(1)?;
        self.level_acc_snapshots
            .as_ref()
            .and_then(|snapshots| snapshots.get(index).copied())
            .filter(|acc| *acc > 0)
    }
}

impl Default for MiningProfile {
    fn default() -> Self {
        Self {
            version: ProfileVersion::V4,
            owner: Pubkey::default(),
            next_position_index: 0,
            active_hp: 0,
            xp: 0,
            badge_tier: 0,
            badge_bonus_bps: 0,
            bump: 0,
            level: 1,
            last_xp_update_ts: 0,
            level_acc_snapshots: Some([0; LEVEL_SNAPSHOT_COUNT]),
            active_effective_hp: Some(0),
        }
    }
}

impl VersionedAccount for MiningProfile {
    type Version = ProfileVersion;

    const NAME: &'static str = "UserMiningProfile";

    const LAYOUTS: &'static [(usize, ProfileVersion)] = &[
        (MINING_PROFILE_V1_LEN, ProfileVersion::V1),
        (MINING_PROFILE_V2_LEN, ProfileVersion::V2),
        (MINING_PROFILE_V3_LEN, ProfileVersion::V3),
        (MINING_PROFILE_V4_LEN, ProfileVersion::V4),
    ];

    fn version(&self) -> ProfileVersion {
        self.version
    }

    fn decode_body(body: &[u8], version: ProfileVersion) -> Result<Self, DecodeError> {
        Ok(match version {
            ProfileVersion::V1 => Self::from_v1(cast_body(body)?),
            ProfileVersion::V2 => Self::from_v2(cast_body(body)?),
            ProfileVersion::V3 => Self::from_v3(cast_body(body)?),
            ProfileVersion::V4 => {
                let raw: &MiningProfileV4 = cast_body(body)?;
                Self {
                    version: ProfileVersion::V4,
                    active_effective_hp: Some(raw.active_effective_hp),
                    ..Self::from_v3(&raw.v3)
                }
            }
        })
    }

    fn encode_body(&self, version: ProfileVersion) -> Vec<u8> {
        match version {
            ProfileVersion::V1 => bytemuck::bytes_of(&self.to_v1()).to_vec(),
            ProfileVersion::V2 => bytemuck::bytes_of(&self.to_v2()).to_vec(),
            ProfileVersion::V3 => bytemuck::bytes_of(&self.to_v3()).to_vec(),
            ProfileVersion::V4 => bytemuck::bytes_of(&MiningProfileV4 {
                v3: self.to_v3(),
                active_effective_hp: self.active_effective_hp.unwrap_or_default(),
            })
            .to_vec(),
        }
    }
}

impl MiningProfile {
    fn from_v1(raw: &MiningProfileV1) -> Self {
        Self {
            version: ProfileVersion::V1,
            owner: raw.owner,
            next_position_index: raw.next_position_index,
            active_hp: raw.active_hp,
            xp: raw.xp,
            badge_tier: raw.badge_tier,
            badge_bonus_bps: raw.badge_bonus_bps,
            bump: raw.bump,
            level: 0,
            last_xp_update_ts: 0,
            level_acc_snapshots: None,
            active_effective_hp: None,
        }
    }

    fn from_v2(raw: &MiningProfileV2) -> Self {
        Self {
            version: ProfileVersion::V2,
            level: raw.level,
            last_xp_update_ts: raw.last_xp_update_ts,
            ..Self::from_v1(&raw.v1)
        }
    }

    fn from_v3(raw: &MiningProfileV3) -> Self {
        Self {
            version: ProfileVersion::V3,
            level_acc_snapshots: Some(raw.level_acc_snapshots),
            ..Self::from_v2(&raw.v2)
        }
    }

    fn to_v1(&self) -> MiningProfileV1 {
        MiningProfileV1 {
            owner: self.owner,
            next_position_index: self.next_position_index,
            active_hp: self.active_hp,
            xp: self.xp,
            badge_tier: self.badge_tier,
            badge_bonus_bps: self.badge_bonus_bps,
            bump: self.bump,
        }
    }

    fn to_v2(&self) -> MiningProfileV2 {
        MiningProfileV2 {
            v1: self.to_v1(),
            level: self.level,
            last_xp_update_ts: self.last_xp_update_ts,
        }
    }

    fn to_v3(&self) -> MiningProfileV3 {
        MiningProfileV3 {
            v2: self.to_v2(),
            level_acc_snapshots: self.level_acc_snapshots.unwrap_or_default(),
        }
    }
}
