use std::future::Future;
use std::str::FromStr;

use anyhow::Result;
use log::warn;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{clock::Clock, pubkey::Pubkey, signature::Signature};
use solana_transaction_status::option_serializer::OptionSerializer;

use crate::utils;

/// One entry of a signature page, newest first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignatureInfo {
    pub signature: Signature,
    pub failed: bool,
    pub block_time: Option<i64>,
}

/// The parts of a confirmed transaction the burn pipeline reads.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionRecord {
    pub block_time: Option<i64>,
    pub failed: bool,
    pub log_messages: Vec<String>,
}

/// Read access to program-owned accounts and the ledger clock.
pub trait LedgerSource: Sync {
    fn get_account_data(&self, address: &Pubkey) -> impl Future<Output = Result<Option<Vec<u8>>>> + Send;

    /// Output order matches `addresses`.
    fn get_multiple_account_data(
        &self,
        addresses: &[Pubkey],
    ) -> impl Future<Output = Result<Vec<Option<Vec<u8>>>>> + Send;

    /// Every program account whose data is exactly `size` bytes.
    fn get_program_accounts_by_size(
        &self,
        size: usize,
    ) -> impl Future<Output = Result<Vec<(Pubkey, Vec<u8>)>>> + Send;

    fn get_clock(&self) -> impl Future<Output = Result<Clock>> + Send;
}

/// Read access to an address's transaction history.
pub trait HistorySource: Sync {
    /// Up to `limit` signatures older than `before`, newest first.
    fn get_signature_page(
        &self,
        address: &Pubkey,
        before: Option<Signature>,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<SignatureInfo>>> + Send;

    fn get_transaction_record(&self, signature: &Signature) -> impl Future<Output = Result<TransactionRecord>> + Send;
}

impl LedgerSource for RpcClient {
    async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>> {
        utils::get_account_data(self, address).await
    }

    async fn get_multiple_account_data(&self, addresses: &[Pubkey]) -> Result<Vec<Option<Vec<u8>>>> {
        utils::get_multiple_account_data(self, addresses).await
    }

    async fn get_program_accounts_by_size(&self, size: usize) -> Result<Vec<(Pubkey, Vec<u8>)>> {
        utils::get_program_accounts_by_size(self, size).await
    }

    async fn get_clock(&self) -> Result<Clock> {
        utils::get_clock(self).await
    }
}

impl HistorySource for RpcClient {
    async fn get_signature_page(
        &self,
        address: &Pubkey,
        before: Option<Signature>,
        limit: usize,
    ) -> Result<Vec<SignatureInfo>> {
        let page = utils::get_signatures_for_address(self, address, before, None, Some(limit)).await?;

        Ok(page
            .into_iter()
            .filter_map(|status| match Signature::from_str(&status.signature) {
                Ok(signature) => Some(SignatureInfo {
                    signature,
                    failed: status.err.is_some(),
                    block_time: status.block_time,
                }),
                Err(e) => {
                    warn!("Skipping unparseable signature {}: {}", status.signature, e);
                    None
                }
            })
            .collect())
    }

    async fn get_transaction_record(&self, signature: &Signature) -> Result<TransactionRecord> {
        let tx = utils::get_transaction(self, signature).await?;

        let (failed, log_messages) = match tx.transaction.meta {
            Some(meta) => {
                let logs = match meta.log_messages {
                    OptionSerializer::Some(logs) => logs,
                    _ => Vec::new(),
                };
                (meta.err.is_some(), logs)
            }
            None => (false, Vec::new()),
        };

        Ok(TransactionRecord {
            block_time: tx.block_time,
            failed,
            log_messages,
        })
    }
}
