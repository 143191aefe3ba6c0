use std::collections::HashMap;

use anyhow::Result;
use log::{debug, warn};
use mind_api::prelude::*;
use solana_sdk::pubkey::Pubkey;

use crate::source::LedgerSource;
use crate::utils::{find_program_accounts, get_accounts, get_config_account, get_position_accounts, AccountState};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PositionEntry {
    pub index: u64,
    pub address: Pubkey,
    pub account: AccountState<MinerPosition>,
}

/// Everything one refresh read from the ledger for a single owner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MirrorSnapshot {
    pub generation: u64,
    pub owner: Pubkey,
    pub slot: u64,
    /// Ledger clock at fetch time; live projection counts from here.
    pub ledger_time: i64,
    pub config: ProtocolConfig,
    pub profile: AccountState<MiningProfile>,
    pub stake: AccountState<UserStake>,
    pub positions: Vec<PositionEntry>,
    pub network_weight: NetworkWeight,
}

impl MirrorSnapshot {
    pub fn loaded_positions(&self) -> impl Iterator<Item = &MinerPosition> {
        self.positions.iter().filter_map(|entry| entry.account.loaded())
    }
}

/// Read one owner's protocol state.
///
/// A config that cannot be read fails the whole fetch. Profile, stake and
/// position accounts degrade individually.
pub async fn fetch_snapshot<S: LedgerSource>(
    source: &S,
    owner: &Pubkey,
    generation: u64,
    reconcile_network_weight: bool,
) -> Result<MirrorSnapshot> {
    let clock = source.get_clock().await?;
    let now = clock.unix_timestamp;
    let (config, _) = get_config_account(source).await?;

    let mut owner_accounts = get_accounts::<S, MiningProfile>(source, &[profile_pda(*owner).0]).await?;
    let profile = owner_accounts.pop().unwrap_or(AccountState::Missing);
    let mut stake_accounts = get_accounts::<S, UserStake>(source, &[stake_pda(*owner).0]).await?;
    let stake = stake_accounts.pop().unwrap_or(AccountState::Missing);

    let count = profile.loaded().map_or(0, |p| p.next_position_index);
    let positions: Vec<PositionEntry> = get_position_accounts(source, owner, count)
        .await?
        .into_iter()
        .map(|(index, address, account)| PositionEntry { index, address, account })
        .collect();

    let observed = positions.iter().filter_map(|entry| entry.account.loaded());
    let stale = counter_is_stale(config.network_hp_active, observed, now);

    let network_weight = if reconcile_network_weight && stale {
        match scan_network_weight(source, &config, now).await {
            Ok(value) => NetworkWeight::reconstructed(value),
            Err(e) => {
                warn!("Network weight reconstruction failed, using counter: {:?}", e);
                NetworkWeight::counter(config.network_hp_active)
            }
        }
    } else {
        NetworkWeight::counter(config.network_hp_active)
    };

    debug!(
        "Snapshot {} for {}: {} positions, network weight {} ({:?})",
        generation,
        owner,
        positions.len(),
        network_weight.value,
        network_weight.source
    );

    Ok(MirrorSnapshot {
        generation,
        owner: *owner,
        slot: clock.slot,
        ledger_time: now,
        config,
        profile,
        stake,
        positions,
        network_weight,
    })
}

/// Sum composed weights over every active position in the program.
pub async fn scan_network_weight<S: LedgerSource>(source: &S, config: &ProtocolConfig, now: i64) -> Result<u64> {
    let positions: Vec<MinerPosition> = find_program_accounts::<S, MinerPosition>(source)
        .await?
        .into_iter()
        .map(|(_, position)| position)
        .collect();

    let levels: HashMap<Pubkey, u8> = find_program_accounts::<S, MiningProfile>(source)
        .await?
        .into_iter()
        .map(|(_, profile)| (profile.owner, profile.level))
        .collect();

    Ok(reconstruct_network_weight(&positions, &levels, config, now))
}
