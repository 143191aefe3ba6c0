use anyhow::{anyhow, Result};
use solana_account_decoder::UiAccountEncoding;
use solana_client::{
    nonblocking::rpc_client::RpcClient,
    rpc_client::GetConfirmedSignaturesForAddress2Config,
    rpc_config::{RpcAccountInfoConfig, RpcProgramAccountsConfig, RpcTransactionConfig},
    rpc_filter::RpcFilterType,
    rpc_response::RpcConfirmedTransactionStatusWithSignature,
};
use solana_sdk::{
    account::Account,
    clock::Clock,
    commitment_config::CommitmentConfig,
    pubkey::Pubkey,
    signature::Signature,
    sysvar,
};
use solana_transaction_status::{EncodedConfirmedTransactionWithStatusMeta, UiTransactionEncoding};

use crate::utils::retry;

/// Most accounts a single `getMultipleAccounts` call accepts.
pub const MAX_MULTIPLE_ACCOUNTS: usize = 100;

/// Returns the default transaction configuration for RPC calls.
pub fn rpc_tx_config() -> RpcTransactionConfig {
    RpcTransactionConfig {
        encoding: Some(UiTransactionEncoding::Json),
        commitment: Some(CommitmentConfig::confirmed()),
        max_supported_transaction_version: Some(0),
    }
}

/// Fetches an account's data, or `None` when the account does not exist.
pub async fn get_account_data(client: &RpcClient, address: &Pubkey) -> Result<Option<Vec<u8>>> {
    let address = *address;
    retry(|| async {
        client
            .get_account_with_commitment(&address, CommitmentConfig::confirmed())
            .await
            .map(|response| response.value.map(|account| account.data))
            .map_err(|e| anyhow!("Failed to fetch account {}: {}", address, e))
    })
    .await
}

/// Fetches many accounts, chunked to the RPC limit. Output order matches input order.
pub async fn get_multiple_account_data(
    client: &RpcClient,
    addresses: &[Pubkey],
) -> Result<Vec<Option<Vec<u8>>>> {
    let mut out = Vec::with_capacity(addresses.len());

    for chunk in addresses.chunks(MAX_MULTIPLE_ACCOUNTS) {
        let accounts: Vec<Option<Account>> = retry(|| async {
            client
                .get_multiple_accounts(chunk)
                .await
                .map_err(|e| anyhow!("Failed to fetch {} accounts: {}", chunk.len(), e))
        })
        .await?;

        out.extend(accounts.into_iter().map(|a| a.map(|a| a.data)));
    }

    Ok(out)
}

/// Fetches every program account whose data is exactly `size` bytes.
pub async fn get_program_accounts_by_size(client: &RpcClient, size: usize) -> Result<Vec<(Pubkey, Vec<u8>)>> {
    let config = RpcProgramAccountsConfig {
        filters: Some(vec![RpcFilterType::DataSize(size as u64)]),
        account_config: RpcAccountInfoConfig {
            encoding: Some(UiAccountEncoding::Base64),
            data_slice: None,
            commitment: Some(CommitmentConfig::confirmed()),
            min_context_slot: None,
        },
        with_context: None,
        sort_results: true.into(),
    };

    let accounts = retry(|| async {
        client
            .get_program_accounts_with_config(&mind_api::ID, config.clone())
            .await
            .map_err(|e| anyhow!("Failed to fetch program accounts of size {}: {}", size, e))
    })
    .await?;

    Ok(accounts.into_iter().map(|(address, account)| (address, account.data)).collect())
}

/// Reads the ledger clock from the clock sysvar.
pub async fn get_clock(client: &RpcClient) -> Result<Clock> {
    let data = get_account_data(client, &sysvar::clock::ID)
        .await?
        .ok_or_else(|| anyhow!("Clock sysvar not found"))?;
    bincode::deserialize(&data).map_err(|e| anyhow!("Failed to deserialize clock: {}", e))
}

/// Fetches transaction signatures for an address with the given configuration, with retry logic.
pub async fn get_signatures_for_address(
    client: &RpcClient,
    address: &Pubkey,
    before: Option<Signature>,
    until: Option<Signature>,
    limit: Option<usize>,
) -> Result<Vec<RpcConfirmedTransactionStatusWithSignature>> {
    let address = *address;
    retry(|| async {
        let config = GetConfirmedSignaturesForAddress2Config {
            before,
            until,
            limit,
            commitment: Some(CommitmentConfig::confirmed()),
        };
        client
            .get_signatures_for_address_with_config(&address, config)
            .await
            .map_err(|e| anyhow!("Failed to fetch signatures for address {}: {}", address, e))
    })
    .await
}

/// Fetches a transaction by signature with its status meta.
pub async fn get_transaction(
    client: &RpcClient,
    signature: &Signature,
) -> Result<EncodedConfirmedTransactionWithStatusMeta> {
    let signature = *signature;
    retry(|| async {
        client
            .get_transaction_with_config(&signature, rpc_tx_config())
            .await
            .map_err(|e| anyhow!("Failed to fetch transaction {}: {}", signature, e))
    })
    .await
}
