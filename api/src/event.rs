use std::mem::size_of;

use bytemuck::{Pod, Zeroable};
use solana_program::pubkey::Pubkey;

use crate::consts::{BPS_DENOMINATOR, UNSTAKE_BURN_BPS};

/// `sha256("event:MindUnstaked")[..8]`.
pub const UNSTAKE_EVENT_TAG: [u8; 8] = [168, 223, 255, 237, 62, 41, 55, 179];

/// Tag, owner and amount.
pub const UNSTAKE_EVENT_LEN: usize = UNSTAKE_EVENT_TAG.len() + size_of::<UnstakeEvent>();

/// Why a log payload was not an unstake event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventParseError {
    TooShort { len: usize },
    TagMismatch,
}

/// Emitted by the program on every unstake; a fixed share of the amount is burned.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct UnstakeEvent {
    pub owner: Pubkey,
    /// Gross amount in base units, before the burn.
    pub amount: u64,
}

impl UnstakeEvent {
    pub fn try_from_bytes(data: &[u8]) -> Result<Self, EventParseError> {
        if data.len() < UNSTAKE_EVENT_LEN {
            return Err(EventParseError::TooShort { len: data.len() });
        }
        if data[..8] != UNSTAKE_EVENT_TAG {
            return Err(EventParseError::TagMismatch);
        }

        bytemuck::try_pod_read_unaligned(&data[UNSTAKE_EVENT_TAG.len()..UNSTAKE_EVENT_LEN])
            .map_err(|_| EventParseError::TooShort { len: data.len() })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(UNSTAKE_EVENT_LEN);
        data.extend_from_slice(&UNSTAKE_EVENT_TAG);
        data.extend_from_slice(bytemuck::bytes_of(self));
        data
    }

    pub fn burned(&self) -> u64 {
        burned_amount(self.amount)
    }
}

/// Portion of an unstake that is burned, rounded down.
pub fn burned_amount(amount: u64) -> u64 {
    ((amount as u128) * UNSTAKE_BURN_BPS as u128 / BPS_DENOMINATOR) as u64
}
