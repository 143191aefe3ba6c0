use solana_program::pubkey::Pubkey;
use crate::consts::*;

pub fn config_pda() -> (Pubkey, u8) {
    Pubkey::find_program_address(&[CONFIG], &crate::id())
}

pub fn vault_authority_pda() -> (Pubkey, u8) {
    Pubkey::find_program_address(&[VAULT], &crate::id())
}

pub fn staking_reward_vault_pda() -> (Pubkey, u8) {
    Pubkey::find_program_address(&[STAKING_REWARD_VAULT], &crate::id())
}

pub fn treasury_vault_pda() -> (Pubkey, u8) {
    Pubkey::find_program_address(&[TREASURY_VAULT], &crate::id())
}

pub fn position_pda(owner: Pubkey, index: u64) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[POSITION, owner.as_ref(), &index.to_le_bytes()],
        &crate::id(),
    )
}

pub fn profile_pda(owner: Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[PROFILE, owner.as_ref()], &crate::id())
}

pub fn stake_pda(owner: Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[STAKE, owner.as_ref()], &crate::id())
}
