use anyhow::{anyhow, Result};
use log::{debug, warn};
use mind_api::prelude::*;
use solana_sdk::pubkey::Pubkey;

use crate::source::LedgerSource;

/// A decoded account slot. One bad account never fails the surrounding fetch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccountState<T> {
    Missing,
    Invalid(DecodeError),
    Loaded(T),
}

impl<T: VersionedAccount> AccountState<T> {
    pub fn from_data(data: Option<&[u8]>) -> Self {
        match data {
            None => AccountState::Missing,
            Some(data) => match T::from_bytes(data) {
                Ok(account) => AccountState::Loaded(account),
                Err(e) => AccountState::Invalid(e),
            },
        }
    }
}

impl<T> AccountState<T> {
    pub fn loaded(&self) -> Option<&T> {
        match self {
            AccountState::Loaded(account) => Some(account),
            _ => None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, AccountState::Loaded(_))
    }
}

/// Fetches and decodes the protocol config. Any failure here is fatal for the caller.
pub async fn get_config_account<S: LedgerSource>(source: &S) -> Result<(ProtocolConfig, Pubkey)> {
    let data = source
        .get_account_data(&CONFIG_ADDRESS)
        .await?
        .ok_or_else(|| anyhow!("Config account {} not found", CONFIG_ADDRESS))?;
    let config = ProtocolConfig::from_bytes(&data)
        .map_err(|e| anyhow!("Failed to decode config account: {}", e))?;
    Ok((config, CONFIG_ADDRESS))
}

/// Fetches and decodes a set of accounts of one class, keeping failures in place.
pub async fn get_accounts<S, T>(source: &S, addresses: &[Pubkey]) -> Result<Vec<AccountState<T>>>
where
    S: LedgerSource,
    T: VersionedAccount,
{
    let data = source.get_multiple_account_data(addresses).await?;
    if data.len() != addresses.len() {
        return Err(anyhow!(
            "Requested {} accounts but received {}",
            addresses.len(),
            data.len()
        ));
    }

    let states = data
        .iter()
        .zip(addresses)
        .map(|(data, address)| {
            let state = AccountState::<T>::from_data(data.as_deref());
            if let AccountState::Invalid(e) = &state {
                warn!("Account {} ({}) unavailable: {}", address, T::NAME, e);
            }
            state
        })
        .collect();

    Ok(states)
}

/// Fetches an owner's positions by PDA index, `0..count`.
pub async fn get_position_accounts<S: LedgerSource>(
    source: &S,
    owner: &Pubkey,
    count: u64,
) -> Result<Vec<(u64, Pubkey, AccountState<MinerPosition>)>> {
    let addresses: Vec<Pubkey> = (0..count).map(|index| position_pda(*owner, index).0).collect();
    let states = get_accounts::<S, MinerPosition>(source, &addresses).await?;

    Ok((0..count)
        .zip(addresses)
        .zip(states)
        .map(|((index, address), state)| (index, address, state))
        .collect())
}

/// Scans every program account of one class across all known layouts.
///
/// Undecodable accounts are logged and skipped.
pub async fn find_program_accounts<S, T>(source: &S) -> Result<Vec<(Pubkey, T)>>
where
    S: LedgerSource,
    T: VersionedAccount,
{
    let mut found = Vec::new();

    for (size, version) in T::LAYOUTS {
        let accounts = source.get_program_accounts_by_size(*size).await?;
        debug!("Found {} {} accounts at {:?}", accounts.len(), T::NAME, version);

        for (address, data) in accounts {
            match T::from_bytes(&data) {
                Ok(account) => found.push((address, account)),
                Err(e) => warn!("Skipping {} account {}: {}", T::NAME, address, e),
            }
        }
    }

    Ok(found)
}
