use std::mem::size_of;

use bytemuck::{Pod, Zeroable};
use solana_program::pubkey::Pubkey;

use crate::consts::DISCRIMINATOR_LEN;
use crate::decode::{cast_body, VersionedAccount};
use crate::error::DecodeError;

pub const USER_STAKE_V1_LEN: usize = DISCRIMINATOR_LEN + size_of::<UserStakeV1>();
pub const USER_STAKE_V2_LEN: usize = DISCRIMINATOR_LEN + size_of::<UserStakeV2>();

#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct UserStakeV1 {
    pub owner: Pubkey,
    pub staked_mind: u64,
    pub reward_debt: u128,
    pub reward_owed: u64,
    pub bump: u8,
}

#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct UserStakeV2 {
    pub v1: UserStakeV1,
    pub stake_index: u64,
    pub start_ts: i64,
    pub lock_end_ts: i64,
    pub xp_boost_bps: u16,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StakeVersion {
    V1,
    /// Adds lock terms and the XP boost.
    V2,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserStake {
    pub version: StakeVersion,

    pub owner: Pubkey,
    pub staked_mind: u64,
    pub reward_debt: u128,
    pub reward_owed: u64,
    pub bump: u8,

    pub stake_index: u64,
    pub start_ts: i64,
    pub lock_end_ts: i64,
    pub xp_boost_bps: u16,
}

impl Default for StakeVersion {
    fn default() -> Self {
        StakeVersion::V2
    }
}

impl UserStake {
    pub fn lock_duration(&self) -> i64 {
        self.lock_end_ts.saturating_sub(self.start_ts).max(0)
    }
}

impl VersionedAccount for UserStake {
    type Version = StakeVersion;

    const NAME: &'static str = "UserStake";

    const LAYOUTS: &'static [(usize, StakeVersion)] = &[
        (USER_STAKE_V1_LEN, StakeVersion::V1),
        (USER_STAKE_V2_LEN, StakeVersion::V2),
    ];

    fn version(&self) -> StakeVersion {
        self.version
    }

    fn decode_body(body: &[u8], version: StakeVersion) -> Result<Self, DecodeError> {
        Ok(match version {
            StakeVersion::V1 => Self::from_v1(cast_body(body)?),
            StakeVersion::V2 => {
                let raw: &UserStakeV2 = cast_body(body)?;
                Self {
                    version: StakeVersion::V2,
                    stake_index: raw.stake_index,
                    start_ts: raw.start_ts,
                    lock_end_ts: raw.lock_end_ts,
                    xp_boost_bps: raw.xp_boost_bps,
                    ..Self::from_v1(&raw.v1)
                }
            }
        })
    }

    fn encode_body(&self, version: StakeVersion) -> Vec<u8> {
        let v1 = UserStakeV1 {
            owner: self.owner,
            staked_mind: self.staked_mind,
            reward_debt: self.reward_debt,
            reward_owed: self.reward_owed,
            bump: self.bump,
        };
        match version {
            StakeVersion::V1 => bytemuck::bytes_of(&v1).to_vec(),
            StakeVersion::V2 => bytemuck::bytes_of(&UserStakeV2 {
                v1,
                stake_index: self.stake_index,
                start_ts: self.start_ts,
                lock_end_ts: self.lock_end_ts,
                xp_boost_bps: self.xp_boost_bps,
            })
            .to_vec(),
        }
    }
}

impl UserStake {
    fn from_v1(raw: &UserStakeV1) -> Self {
        Self {
            version: StakeVersion::V1,
            owner: raw.owner,
            staked_mind: raw.staked_mind,
            reward_debt: raw.reward_debt,
            reward_owed: raw.reward_owed,
            bump: raw.bump,
            ..Default::default()
        }
    }
}
