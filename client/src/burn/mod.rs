mod cache;
mod extract;

pub use cache::*;
pub use extract::*;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use crate::config::{MirrorConfig, DEFAULT_SIGNATURE_PAGE_SIZE, DEFAULT_TRANSACTION_BATCH_SIZE};

/// Unstaked and burned totals for one UTC calendar day, in base units.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BurnDay {
    /// `YYYY-MM-DD`.
    pub date: String,
    pub unstaked_amount: u64,
    pub burned_amount: u64,
}

/// Counts of everything the extractor looked at and why it skipped it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionStats {
    pub signatures: u64,
    pub transactions_scanned: u64,
    pub failed_transactions: u64,
    pub failed_batches: u64,
    pub events: u64,
    pub malformed_payloads: u64,
    pub short_payloads: u64,
    pub tag_mismatches: u64,
    pub excluded_events: u64,
    pub missing_block_time: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BurnSummary {
    /// Ascending by date.
    pub days: Vec<BurnDay>,
    pub total_unstaked: u64,
    pub total_burned: u64,
    /// ISO-8601 with millisecond precision, UTC.
    pub latest_event_at: Option<String>,
    pub excluded_owners: Vec<String>,
    pub diagnostics: ExtractionStats,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BurnOptions {
    pub page_size: usize,
    pub batch_size: usize,
    pub excluded_owners: Vec<Pubkey>,
}

impl Default for BurnOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_SIGNATURE_PAGE_SIZE,
            batch_size: DEFAULT_TRANSACTION_BATCH_SIZE,
            excluded_owners: Vec::new(),
        }
    }
}

impl BurnOptions {
    pub fn from_config(config: &MirrorConfig) -> Result<Self> {
        Ok(Self {
            page_size: config.signature_page_size,
            batch_size: config.transaction_batch_size,
            excluded_owners: config.excluded_owner_keys()?,
        })
    }
}
