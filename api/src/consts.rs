use const_crypto::ed25519;
use solana_program::pubkey::Pubkey;

pub const CONFIG: &[u8]                    = b"config";
pub const VAULT: &[u8]                     = b"vault";
pub const POSITION: &[u8]                  = b"position";
pub const PROFILE: &[u8]                   = b"profile";
pub const STAKE: &[u8]                     = b"stake";
pub const STAKING_REWARD_VAULT: &[u8]      = b"staking_reward_vault";
pub const TREASURY_VAULT: &[u8]            = b"treasury_vault";

pub const DISCRIMINATOR_LEN: usize         = 8;

pub const BPS_DENOMINATOR: u128            = 10_000;
pub const ACC_SCALE: u128                  = 1_000_000_000_000_000_000;

pub const SECONDS_PER_DAY_DEFAULT: u64     = 86_400;
pub const XP_SECONDS_PER_POINT: u64        = 36_000;

pub const MIND_DECIMALS_DEFAULT: u8        = 9;
pub const XNT_DECIMALS_DEFAULT: u8         = 9;

pub const BADGE_BONUS_CAP_BPS: u16         = 2_000; // 20%
pub const LEVEL_BONUS_CAP_BPS: u16         = 1_000; // 10%
pub const GLOBAL_BUFF_CAP_BPS_DEFAULT: u16 = 1_500; // 15%
pub const UNSTAKE_BURN_BPS: u16            = 300;   // 3%

pub const MAX_LEVEL: u8                    = 6;
pub const MAX_BUFF_LEVEL: u8               = 3;

pub const UNSTAKE_EVENT_NAME: &str         = "MindUnstaked";

// -- Const Addresses --

pub const PROGRAM_ID: [u8; 32] =
    unsafe { *(&crate::id() as *const Pubkey as *const [u8; 32]) };

pub const CONFIG_ADDRESS: Pubkey =
    Pubkey::new_from_array(ed25519::derive_program_address(&[CONFIG], &PROGRAM_ID).0);

pub const CONFIG_BUMP: u8 =
    ed25519::derive_program_address(&[CONFIG], &PROGRAM_ID).1;

pub const VAULT_AUTHORITY_ADDRESS: Pubkey =
    Pubkey::new_from_array(ed25519::derive_program_address(&[VAULT], &PROGRAM_ID).0);

pub const VAULT_AUTHORITY_BUMP: u8 =
    ed25519::derive_program_address(&[VAULT], &PROGRAM_ID).1;

pub const STAKING_REWARD_VAULT_ADDRESS: Pubkey =
    Pubkey::new_from_array(ed25519::derive_program_address(&[STAKING_REWARD_VAULT], &PROGRAM_ID).0);

pub const TREASURY_VAULT_ADDRESS: Pubkey =
    Pubkey::new_from_array(ed25519::derive_program_address(&[TREASURY_VAULT], &PROGRAM_ID).0);
