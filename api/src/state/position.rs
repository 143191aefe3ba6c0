use std::mem::size_of;

use bytemuck::{Pod, Zeroable};
use solana_program::pubkey::Pubkey;

use crate::consts::DISCRIMINATOR_LEN;
use crate::decode::{cast_body, VersionedAccount};
use crate::error::DecodeError;
use crate::tables::RigType;

pub const MINER_POSITION_V1_LEN: usize = DISCRIMINATOR_LEN + size_of::<MinerPositionV1>();
pub const MINER_POSITION_V2_LEN: usize = DISCRIMINATOR_LEN + size_of::<MinerPositionV2>();
pub const MINER_POSITION_V3_LEN: usize = DISCRIMINATOR_LEN + size_of::<MinerPositionV3>();

#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct MinerPositionV1 {
    pub owner: Pubkey,
    pub hp: u64,
    pub start_ts: i64,
    pub end_ts: i64,
    pub reward_debt: u128,
    pub final_acc_mind_per_hp: u128,
    pub deactivated: u8,
    pub bump: u8,
}

#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct MinerPositionV2 {
    pub v1: MinerPositionV1,
    pub rig_type: u8,
    pub hp_scaled: u8,
}

#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct MinerPositionV3 {
    pub v2: MinerPositionV2,
    pub expired: u8,
    pub buff_level: u8,
    pub buff_effective_ts: i64,
    pub debt_level: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum PositionVersion {
    V1,
    /// Adds `rig_type` and `hp_scaled`.
    V2,
    /// Adds expiry, renewal buff and debt level tracking.
    V3,
}

/// A single rig contract owned by a miner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MinerPosition {
    pub version: PositionVersion,

    pub owner: Pubkey,
    /// Base weight. Once `hp_scaled` is set this holds the composed weight instead.
    pub hp: u64,
    pub start_ts: i64,
    pub end_ts: i64,
    pub reward_debt: u128,
    pub final_acc_mind_per_hp: u128,
    pub deactivated: bool,
    pub bump: u8,

    /// Raw rig byte; `None` for layouts that predate it.
    pub rig_type: Option<u8>,
    pub hp_scaled: bool,

    pub expired: bool,
    pub buff_level: u8,
    pub buff_effective_ts: i64,
    /// Profile level the debt was recorded at; `None` when unknown.
    pub debt_level: Option<u8>,
}

impl MinerPosition {
    /// Rig class, inferred from the contract duration when the layout has no rig byte
    /// or the stored byte is not a known rig.
    pub fn rig(&self, seconds_per_day: u64) -> RigType {
        self.rig_type
            .and_then(|raw| RigType::try_from(raw).ok())
            .unwrap_or_else(|| RigType::infer(self.start_ts, self.end_ts, seconds_per_day))
    }

    /// Whether the contract has run out, regardless of ledger settlement.
    pub fn has_ended(&self, now: i64) -> bool {
        now >= self.end_ts
    }

    /// Past its end but not yet settled by the ledger.
    pub fn is_pending_settlement(&self, now: i64) -> bool {
        !self.deactivated && self.has_ended(now)
    }

    /// Whether a renewal buff is scheduled but not yet folded into the debt.
    pub fn has_scheduled_buff(&self) -> bool {
        self.buff_effective_ts > 0
    }
}

impl Default for MinerPosition {
    fn default() -> Self {
        Self {
            version: PositionVersion::V3,
            owner: Pubkey::default(),
            hp: 0,
            start_ts: 0,
            end_ts: 0,
            reward_debt: 0,
            final_acc_mind_per_hp: 0,
            deactivated: false,
            bump: 0,
            rig_type: Some(RigType::Basic.into()),
            hp_scaled: false,
            expired: false,
            buff_level: 0,
            buff_effective_ts: 0,
            debt_level: Some(0),
        }
    }
}

impl VersionedAccount for MinerPosition {
    type Version = PositionVersion;

    const NAME: &'static str = "MinerPosition";

    const LAYOUTS: &'static [(usize, PositionVersion)] = &[
        (MINER_POSITION_V1_LEN, PositionVersion::V1),
        (MINER_POSITION_V2_LEN, PositionVersion::V2),
        (MINER_POSITION_V3_LEN, PositionVersion::V3),
    ];

    fn version(&self) -> PositionVersion {
        self.version
    }

    fn decode_body(body: &[u8], version: PositionVersion) -> Result<Self, DecodeError> {
        Ok(match version {
            PositionVersion::V1 => Self::from_v1(cast_body(body)?),
            PositionVersion::V2 => Self::from_v2(cast_body(body)?),
            PositionVersion::V3 => Self::from_v3(cast_body(body)?),
        })
    }

    fn encode_body(&self, version: PositionVersion) -> Vec<u8> {
        match version {
            PositionVersion::V1 => bytemuck::bytes_of(&self.to_v1()).to_vec(),
            PositionVersion::V2 => bytemuck::bytes_of(&self.to_v2()).to_vec(),
            PositionVersion::V3 => bytemuck::bytes_of(&self.to_v3()).to_vec(),
        }
    }
}

impl MinerPosition {
    fn from_v1(raw: &MinerPositionV1) -> Self {
        let deactivated = raw.deactivated != 0;
        Self {
            version: PositionVersion::V1,
            owner: raw.owner,
            hp: raw.hp,
            start_ts: raw.start_ts,
            end_ts: raw.end_ts,
            reward_debt: raw.reward_debt,
            final_acc_mind_per_hp: raw.final_acc_mind_per_hp,
            deactivated,
            bump: raw.bump,
            rig_type: None,
            // Settlement always rewrote `hp` before the flag existed.
            hp_scaled: deactivated,
            expired: false,
            buff_level: 0,
            buff_effective_ts: 0,
            debt_level: None,
        }
    }

    fn from_v2(raw: &MinerPositionV2) -> Self {
        Self {
            version: PositionVersion::V2,
            rig_type: Some(raw.rig_type),
            hp_scaled: raw.hp_scaled != 0,
            ..Self::from_v1(&raw.v1)
        }
    }

    fn from_v3(raw: &MinerPositionV3) -> Self {
        Self {
            version: PositionVersion::V3,
            expired: raw.expired != 0,
            buff_level: raw.buff_level,
            buff_effective_ts: raw.buff_effective_ts,
            debt_level: Some(raw.debt_level),
            ..Self::from_v2(&raw.v2)
        }
    }

    fn to_v1(&self) -> MinerPositionV1 {
        MinerPositionV1 {
            owner: self.owner,
            hp: self.hp,
            start_ts: self.start_ts,
            end_ts: self.end_ts,
            reward_debt: self.reward_debt,
            final_acc_mind_per_hp: self.final_acc_mind_per_hp,
            deactivated: self.deactivated as u8,
            bump: self.bump,
        }
    }

    fn to_v2(&self) -> MinerPositionV2 {
        MinerPositionV2 {
            v1: self.to_v1(),
            rig_type: self.rig_type.unwrap_or_default(),
            hp_scaled: self.hp_scaled as u8,
        }
    }

    fn to_v3(&self) -> MinerPositionV3 {
        MinerPositionV3 {
            v2: self.to_v2(),
            expired: self.expired as u8,
            buff_level: self.buff_level,
            buff_effective_ts: self.buff_effective_ts,
            debt_level: self.debt_level.unwrap_or_default(),
        }
    }
}
