use std::mem::size_of;

use bytemuck::{Pod, Zeroable};
use solana_program::pubkey::Pubkey;

use crate::consts::*;
use crate::decode::{cast_body, VersionedAccount};
use crate::error::DecodeError;

pub const PROTOCOL_CONFIG_V1_LEN: usize = DISCRIMINATOR_LEN + size_of::<ProtocolConfigV1>();
pub const PROTOCOL_CONFIG_V2_LEN: usize = DISCRIMINATOR_LEN + size_of::<ProtocolConfigV2>();

#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct ProtocolConfigV1 {
    pub admin: Pubkey,
    pub emission_per_sec: u64,
    pub acc_mind_per_hp: u128,
    pub last_update_ts: i64,
    pub network_hp_active: u64,

    pub mind_mint: Pubkey,
    pub xnt_mint: Pubkey,
    pub staking_reward_vault: Pubkey,
    pub treasury_vault: Pubkey,
    pub staking_mind_vault: Pubkey,

    pub max_effective_hp: u64,
    pub seconds_per_day: u64,

    pub staking_acc_xnt_per_mind: u128,
    pub staking_last_update_ts: i64,
    pub staking_reward_rate_xnt_per_sec: u64,
    pub staking_epoch_end_ts: i64,
    pub staking_total_staked_mind: u64,
    pub staking_undistributed_xnt: u64,
    pub staking_accounted_balance: u64,

    pub config_bump: u8,
    pub vault_authority_bump: u8,
}

#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct ProtocolConfigV2 {
    pub v1: ProtocolConfigV1,
    pub mind_decimals: u8,
    pub xnt_decimals: u8,
    pub global_buff_cap_bps: u16,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigVersion {
    V1,
    /// Adds token decimals and the global buff cap.
    V2,
}

/// The protocol singleton: mining emission, staking epoch and vault addresses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProtocolConfig {
    pub version: ConfigVersion,

    pub admin: Pubkey,
    pub emission_per_sec: u64,
    pub acc_mind_per_hp: u128,
    pub last_update_ts: i64,
    pub network_hp_active: u64,

    pub mind_mint: Pubkey,
    pub xnt_mint: Pubkey,
    pub staking_reward_vault: Pubkey,
    pub treasury_vault: Pubkey,
    pub staking_mind_vault: Pubkey,

    pub max_effective_hp: u64,
    pub seconds_per_day: u64,

    pub staking_acc_xnt_per_mind: u128,
    pub staking_last_update_ts: i64,
    pub staking_reward_rate_xnt_per_sec: u64,
    pub staking_epoch_end_ts: i64,
    pub staking_total_staked_mind: u64,
    pub staking_undistributed_xnt: u64,
    pub staking_accounted_balance: u64,

    pub config_bump: u8,
    pub vault_authority_bump: u8,

    pub mind_decimals: u8,
    pub xnt_decimals: u8,
    pub global_buff_cap_bps: u16,
}

impl ProtocolConfig {
    /// Seconds per rig day, with the ledger's zero normalized to a calendar day.
    pub fn day_length(&self) -> u64 {
        if self.seconds_per_day == 0 {
            SECONDS_PER_DAY_DEFAULT
        } else {
            self.seconds_per_day
        }
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            version: ConfigVersion::V2,
            admin: Pubkey::default(),
            emission_per_sec: 0,
            acc_mind_per_hp: 0,
            last_update_ts: 0,
            network_hp_active: 0,
            mind_mint: Pubkey::default(),
            xnt_mint: Pubkey::default(),
            staking_reward_vault: Pubkey::default(),
            treasury_vault: Pubkey::default(),
            staking_mind_vault: Pubkey::default(),
            max_effective_hp: 0,
            seconds_per_day: SECONDS_PER_DAY_DEFAULT,
            staking_acc_xnt_per_mind: 0,
            staking_last_update_ts: 0,
            staking_reward_rate_xnt_per_sec: 0,
            staking_epoch_end_ts: 0,
            staking_total_staked_mind: 0,
            staking_undistributed_xnt: 0,
            staking_accounted_balance: 0,
            config_bump: 0,
            vault_authority_bump: 0,
            mind_decimals: MIND_DECIMALS_DEFAULT,
            xnt_decimals: XNT_DECIMALS_DEFAULT,
            global_buff_cap_bps: GLOBAL_BUFF_CAP_BPS_DEFAULT,
        }
    }
}

impl VersionedAccount for ProtocolConfig {
    type Version = ConfigVersion;

    const NAME: &'static str = "Config";

    const LAYOUTS: &'static [(usize, ConfigVersion)] = &[
        (PROTOCOL_CONFIG_V1_LEN, ConfigVersion::V1),
        (PROTOCOL_CONFIG_V2_LEN, ConfigVersion::V2),
    ];

    fn version(&self) -> ConfigVersion {
        self.version
    }

    fn decode_body(body: &[u8], version: ConfigVersion) -> Result<Self, DecodeError> {
        Ok(match version {
            ConfigVersion::V1 => Self::from_v1(cast_body(body)?),
            ConfigVersion::V2 => {
                let raw: &ProtocolConfigV2 = cast_body(body)?;
                Self {
                    version: ConfigVersion::V2,
                    mind_decimals: raw.mind_decimals,
                    xnt_decimals: raw.xnt_decimals,
                    global_buff_cap_bps: raw.global_buff_cap_bps,
                    ..Self::from_v1(&raw.v1)
                }
            }
        })
    }

    fn encode_body(&self, version: ConfigVersion) -> Vec<u8> {
        match version {
            ConfigVersion::V1 => bytemuck::bytes_of(&self.to_v1()).to_vec(),
            ConfigVersion::V2 => bytemuck::bytes_of(&ProtocolConfigV2 {
                v1: self.to_v1(),
                mind_decimals: self.mind_decimals,
                xnt_decimals: self.xnt_decimals,
                global_buff_cap_bps: self.global_buff_cap_bps,
            })
            .to_vec(),
        }
    }
}

impl ProtocolConfig {
    fn from_v1(raw: &ProtocolConfigV1) -> Self {
        Self {
            version: ConfigVersion::V1,
            admin: raw.admin,
            emission_per_sec: raw.emission_per_sec,
            acc_mind_per_hp: raw.acc_mind_per_hp,
            last_update_ts: raw.last_update_ts,
            network_hp_active: raw.network_hp_active,
            mind_mint: raw.mind_mint,
            xnt_mint: raw.xnt_mint,
            staking_reward_vault: raw.staking_reward_vault,
            treasury_vault: raw.treasury_vault,
            staking_mind_vault: raw.staking_mind_vault,
            max_effective_hp: raw.max_effective_hp,
            seconds_per_day: raw.seconds_per_day,
            staking_acc_xnt_per_mind: raw.staking_acc_xnt_per_mind,
            staking_last_update_ts: raw.staking_last_update_ts,
            staking_reward_rate_xnt_per_sec: raw.staking_reward_rate_xnt_per_sec,
            staking_epoch_end_ts: raw.staking_epoch_end_ts,
            staking_total_staked_mind: raw.staking_total_staked_mind,
            staking_undistributed_xnt: raw.staking_undistributed_xnt,
            staking_accounted_balance: raw.staking_accounted_balance,
            config_bump: raw.config_bump,
            vault_authority_bump: raw.vault_authority_bump,
            mind_decimals: MIND_DECIMALS_DEFAULT,
            xnt_decimals: XNT_DECIMALS_DEFAULT,
            global_buff_cap_bps: GLOBAL_BUFF_CAP_BPS_DEFAULT,
        }
    }

    fn to_v1(&self) -> ProtocolConfigV1 {
        ProtocolConfigV1 {
            admin: self.admin,
            emission_per_sec: self.emission_per_sec,
            acc_mind_per_hp: self.acc_mind_per_hp,
            last_update_ts: self.last_update_ts,
            network_hp_active: self.network_hp_active,
            mind_mint: self.mind_mint,
            xnt_mint: self.xnt_mint,
            staking_reward_vault: self.staking_reward_vault,
            treasury_vault: self.treasury_vault,
            staking_mind_vault: self.staking_mind_vault,
            max_effective_hp: self.max_effective_hp,
            seconds_per_day: self.seconds_per_day,
            staking_acc_xnt_per_mind: self.staking_acc_xnt_per_mind,
            staking_last_update_ts: self.staking_last_update_ts,
            staking_reward_rate_xnt_per_sec: self.staking_reward_rate_xnt_per_sec,
            staking_epoch_end_ts: self.staking_epoch_end_ts,
            staking_total_staked_mind: self.staking_total_staked_mind,
            staking_undistributed_xnt: self.staking_undistributed_xnt,
            staking_accounted_balance: self.staking_accounted_balance,
            config_bump: self.config_bump,
            vault_authority_bump: self.vault_authority_bump,
        }
    }
}
