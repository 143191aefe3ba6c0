use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use anyhow::{anyhow, Result};
use mind_api::prelude::*;
use mind_client::{
    aggregate_burns, AggregationError, BurnCache, BurnOptions, HistorySource, SignatureInfo, TransactionRecord,
};
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use tokio::time::Duration;

// 2024-07-01T12:00:00Z
const BLOCK_TIME: i64 = 1_719_835_200;
const DAY: i64 = 86_400;

#[derive(Default)]
struct FakeHistory {
    signatures: Vec<SignatureInfo>,
    records: HashMap<Signature, TransactionRecord>,
    broken: HashSet<Signature>,
    listing_down: AtomicBool,
    page_calls: AtomicUsize,
}

impl FakeHistory {
    fn push(&mut self, record: TransactionRecord) -> Signature {
        let signature = Signature::new_unique();
        self.signatures.push(SignatureInfo {
            signature,
            failed: record.failed,
            block_time: record.block_time,
        });
        self.records.insert(signature, record);
        signature
    }
}

impl HistorySource for FakeHistory {
    async fn get_signature_page(
        &self,
        _address: &Pubkey,
        before: Option<Signature>,
        limit: usize,
    ) -> Result<Vec<SignatureInfo>> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;

        if self.listing_down.load(Ordering::SeqCst) {
            return Err(anyhow!("getSignaturesForAddress unavailable"));
        }

        let start = match before {
            Some(before) => self
                .signatures
                .iter()
                .position(|info| info.signature == before)
                .map_or(self.signatures.len(), |i| i + 1),
            None => 0,
        };

        Ok(self.signatures.iter().skip(start).take(limit).cloned().collect())
    }

    async fn get_transaction_record(&self, signature: &Signature) -> Result<TransactionRecord> {
        tokio::task::yield_now().await;

        if self.broken.contains(signature) {
            return Err(anyhow!("transaction {} unavailable", signature));
        }
        self.records
            .get(signature)
            .cloned()
            .ok_or_else(|| anyhow!("unknown transaction {}", signature))
    }
}

fn unstake_logs(payload: &str) -> Vec<String> {
    vec![
        format!("Program {} invoke [1]", mind_api::ID),
        "Program log: Instruction: Unstake".to_string(),
        format!("Program data: {}", payload),
        format!("Program {} success", mind_api::ID),
    ]
}

fn unstake(owner: Pubkey, amount: u64) -> TransactionRecord {
    TransactionRecord {
        block_time: Some(BLOCK_TIME),
        failed: false,
        log_messages: unstake_logs(&base64::encode(UnstakeEvent { owner, amount }.to_bytes())),
    }
}

/// Eight signatures in pages of three and batches of two:
/// a valid unstake, a foreign tag, an excluded owner, a corrupt payload,
/// a batch whose fetch fails, then a failed transaction sharing a batch with
/// an older valid unstake from the previous day.
fn synthetic_history(excluded: Pubkey) -> FakeHistory {
    let mut history = FakeHistory::default();

    history.push(unstake(Pubkey::new_unique(), 100_000));

    let mut foreign = UnstakeEvent { owner: Pubkey::new_unique(), amount: 70_000 }.to_bytes();
    foreign[0] ^= 0xff;
    history.push(TransactionRecord {
        block_time: Some(BLOCK_TIME),
        failed: false,
        log_messages: unstake_logs(&base64::encode(foreign)),
    });

    history.push(unstake(excluded, 500_000));

    history.push(TransactionRecord {
        block_time: Some(BLOCK_TIME),
        failed: false,
        log_messages: unstake_logs("%%corrupt%%"),
    });

    let broken = history.push(unstake(Pubkey::new_unique(), 200_000));
    history.broken.insert(broken);
    history.push(unstake(Pubkey::new_unique(), 50_000));

    history.push(TransactionRecord {
        failed: true,
        ..unstake(Pubkey::new_unique(), 900_000)
    });

    history.push(TransactionRecord {
        block_time: Some(BLOCK_TIME - DAY),
        ..unstake(Pubkey::new_unique(), 40_000)
    });

    history
}

fn options(excluded: Pubkey) -> BurnOptions {
    BurnOptions {
        page_size: 3,
        batch_size: 2,
        excluded_owners: vec![excluded],
    }
}

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[tokio::test]
async fn test_synthetic_history() {
    init_logger();
    let excluded = Pubkey::new_unique();
    let history = synthetic_history(excluded);

    let summary = aggregate_burns(&history, &mind_api::ID, &options(excluded)).await.unwrap();

    // The batch after the failed one still lands.
    assert_eq!(summary.days.len(), 2);
    assert_eq!(summary.days[0].date, "2024-06-30");
    assert_eq!(summary.days[0].unstaked_amount, 40_000);
    assert_eq!(summary.days[0].burned_amount, 1_200);
    assert_eq!(summary.days[1].date, "2024-07-01");
    assert_eq!(summary.days[1].unstaked_amount, 100_000);
    assert_eq!(summary.days[1].burned_amount, 3_000);
    assert_eq!(summary.total_unstaked, 140_000);
    assert_eq!(summary.total_burned, 4_200);
    assert_eq!(summary.latest_event_at.as_deref(), Some("2024-07-01T12:00:00.000Z"));
    assert_eq!(summary.excluded_owners, vec![excluded.to_string()]);

    let stats = &summary.diagnostics;
    assert_eq!(stats.signatures, 8);
    assert_eq!(stats.transactions_scanned, 5);
    assert_eq!(stats.failed_batches, 1);
    assert_eq!(stats.failed_transactions, 1);
    assert_eq!(stats.events, 2);
    assert_eq!(stats.tag_mismatches, 1);
    assert_eq!(stats.excluded_events, 1);
    assert_eq!(stats.malformed_payloads, 1);

    // Pages of 3, 3 and 2.
    assert_eq!(history.page_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_summary_json_shape() {
    let excluded = Pubkey::new_unique();
    let history = synthetic_history(excluded);
    let summary = aggregate_burns(&history, &mind_api::ID, &options(excluded)).await.unwrap();

    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["days"][0]["date"], "2024-06-30");
    assert_eq!(json["days"][1]["date"], "2024-07-01");
    assert_eq!(json["days"][1]["unstakedAmount"], 100_000);
    assert_eq!(json["days"][1]["burnedAmount"], 3_000);
    assert_eq!(json["totalUnstaked"], 140_000);
    assert_eq!(json["totalBurned"], 4_200);
    assert_eq!(json["latestEventAt"], "2024-07-01T12:00:00.000Z");
    assert_eq!(json["excludedOwners"][0], excluded.to_string());
    assert_eq!(json["diagnostics"]["failedBatches"], 1);
}

#[tokio::test]
async fn test_empty_history() {
    let history = FakeHistory::default();
    let summary = aggregate_burns(&history, &mind_api::ID, &BurnOptions::default()).await.unwrap();

    assert!(summary.days.is_empty());
    assert_eq!(summary.total_burned, 0);
    assert_eq!(summary.latest_event_at, None);
    assert_eq!(history.page_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_enumeration_failure_leaves_cache_untouched() {
    init_logger();
    let excluded = Pubkey::new_unique();
    let history = synthetic_history(excluded);
    let cache = BurnCache::new(Duration::ZERO);

    let first = cache.get_or_refresh(&history, &mind_api::ID, &options(excluded)).await.unwrap();

    history.listing_down.store(true, Ordering::SeqCst);
    let err = cache
        .get_or_refresh(&history, &mind_api::ID, &options(excluded))
        .await
        .unwrap_err();

    assert!(matches!(err, AggregationError::SignatureEnumerationFailed(_)));
    assert_eq!(cache.peek().await, Some(first));
    assert_eq!(cache.walks(), 2);
}

#[tokio::test]
async fn test_concurrent_requests_share_one_walk() {
    let excluded = Pubkey::new_unique();
    let history = synthetic_history(excluded);
    let cache = BurnCache::new(Duration::from_secs(300));
    let options = options(excluded);

    let (a, b, c) = tokio::join!(
        cache.get_or_refresh(&history, &mind_api::ID, &options),
        cache.get_or_refresh(&history, &mind_api::ID, &options),
        cache.get_or_refresh(&history, &mind_api::ID, &options),
    );

    let a = a.unwrap();
    assert_eq!(a, b.unwrap());
    assert_eq!(a, c.unwrap());
    assert_eq!(cache.walks(), 1);
    assert_eq!(history.page_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_invalidate_forces_new_walk() {
    let excluded = Pubkey::new_unique();
    let history = synthetic_history(excluded);
    let cache = BurnCache::new(Duration::from_secs(300));

    cache.get_or_refresh(&history, &mind_api::ID, &options(excluded)).await.unwrap();
    cache.invalidate().await;
    assert_eq!(cache.peek().await, None);

    cache.get_or_refresh(&history, &mind_api::ID, &options(excluded)).await.unwrap();
    assert_eq!(cache.walks(), 2);
}
