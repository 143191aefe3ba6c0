use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use futures::future::try_join_all;
use log::{debug, warn};
use mind_api::prelude::{EventParseError, UnstakeEvent};
use solana_sdk::{pubkey::Pubkey, signature::Signature};

use super::{BurnDay, BurnOptions, BurnSummary, ExtractionStats};
use crate::error::AggregationError;
use crate::source::{HistorySource, SignatureInfo, TransactionRecord};

/// Pull unstake events out of one transaction's logs.
///
/// Only `Program data:` lines emitted while `program_id` is the innermost
/// running program are considered.
pub fn extract_unstake_events(
    log_messages: &[String],
    program_id: &Pubkey,
    stats: &mut ExtractionStats,
) -> Vec<UnstakeEvent> {
    let mut events = Vec::new();
    let mut program_stack: Vec<Pubkey> = Vec::new();

    for log in log_messages {
        if is_program_invoke(log) {
            if let Some(id) = get_program_id(log) {
                program_stack.push(id);
            }
            continue;
        }
        if is_program_success(log) || is_program_failure(log) {
            program_stack.pop();
            continue;
        }

        if program_stack.last() != Some(program_id) || !is_program_data(log) {
            continue;
        }

        let Some(data) = get_event_data(log) else {
            stats.malformed_payloads += 1;
            continue;
        };

        match UnstakeEvent::try_from_bytes(&data) {
            Ok(event) => events.push(event),
            Err(EventParseError::TooShort { .. }) => stats.short_payloads += 1,
            Err(EventParseError::TagMismatch) => stats.tag_mismatches += 1,
        }
    }

    events
}

#[derive(Clone, Copy, Debug, Default)]
struct DayTotals {
    unstaked: u64,
    burned: u64,
}

/// Folds unstake events into per-day totals.
pub struct BurnAggregator {
    program_id: Pubkey,
    excluded: HashSet<Pubkey>,
    days: BTreeMap<NaiveDate, DayTotals>,
    total_unstaked: u64,
    total_burned: u64,
    latest_event_at: Option<i64>,
    pub stats: ExtractionStats,
}

impl BurnAggregator {
    pub fn new(program_id: Pubkey, excluded: impl IntoIterator<Item = Pubkey>) -> Self {
        Self {
            program_id,
            excluded: excluded.into_iter().collect(),
            days: BTreeMap::new(),
            total_unstaked: 0,
            total_burned: 0,
            latest_event_at: None,
            stats: ExtractionStats::default(),
        }
    }

    /// Add one fetched transaction. `fallback_time` comes from the signature listing.
    pub fn record_transaction(&mut self, record: &TransactionRecord, fallback_time: Option<i64>) {
        self.stats.transactions_scanned += 1;

        if record.failed {
            self.stats.failed_transactions += 1;
            return;
        }

        let events = extract_unstake_events(&record.log_messages, &self.program_id, &mut self.stats);
        if events.is_empty() {
            return;
        }

        let block_time = record.block_time.or(fallback_time);
        let date = block_time
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
            .map(|dt| dt.date_naive());

        for event in events {
            if self.excluded.contains(&event.owner) {
                self.stats.excluded_events += 1;
                continue;
            }
            let (Some(ts), Some(date)) = (block_time, date) else {
                self.stats.missing_block_time += 1;
                continue;
            };

            let burned = event.burned();
            let day = self.days.entry(date).or_default();
            day.unstaked = day.unstaked.saturating_add(event.amount);
            day.burned = day.burned.saturating_add(burned);

            self.total_unstaked = self.total_unstaked.saturating_add(event.amount);
            self.total_burned = self.total_burned.saturating_add(burned);
            self.latest_event_at = Some(self.latest_event_at.map_or(ts, |latest| latest.max(ts)));
            self.stats.events += 1;
        }
    }

    pub fn finish(self) -> BurnSummary {
        let days = self
            .days
            .iter()
            .map(|(date, totals)| BurnDay {
                date: date.format("%Y-%m-%d").to_string(),
                unstaked_amount: totals.unstaked,
                burned_amount: totals.burned,
            })
            .collect();

        let mut excluded_owners: Vec<String> = self.excluded.iter().map(|o| o.to_string()).collect();
        excluded_owners.sort();

        BurnSummary {
            days,
            total_unstaked: self.total_unstaked,
            total_burned: self.total_burned,
            latest_event_at: self.latest_event_at.and_then(format_timestamp),
            excluded_owners,
            diagnostics: self.stats,
        }
    }
}

/// `2024-07-01T12:00:00.000Z`.
pub fn format_timestamp(ts: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp(ts, 0).map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Walk the address's history newest to oldest until a short or empty page.
pub async fn collect_signatures<S: HistorySource>(
    source: &S,
    address: &Pubkey,
    page_size: usize,
) -> Result<Vec<SignatureInfo>, AggregationError> {
    let mut signatures = Vec::new();
    let mut before: Option<Signature> = None;

    loop {
        let page = source
            .get_signature_page(address, before, page_size)
            .await
            .map_err(|e| AggregationError::SignatureEnumerationFailed(e.to_string()))?;

        let full = page.len() >= page_size;
        before = page.last().map(|info| info.signature);
        signatures.extend(page);

        if !full || before.is_none() {
            break;
        }
    }

    debug!("Collected {} signatures for {}", signatures.len(), address);
    Ok(signatures)
}

/// Rebuild the burn ledger for `program_id` from its public logs.
///
/// A batch whose fetch fails contributes nothing and is counted; only a
/// failure to enumerate signatures aborts the pass.
pub async fn aggregate_burns<S: HistorySource>(
    source: &S,
    program_id: &Pubkey,
    options: &BurnOptions,
) -> Result<BurnSummary, AggregationError> {
    let signatures = collect_signatures(source, program_id, options.page_size.max(1)).await?;

    let mut aggregator = BurnAggregator::new(*program_id, options.excluded_owners.iter().copied());
    aggregator.stats.signatures = signatures.len() as u64;

    for batch in signatures.chunks(options.batch_size.max(1)) {
        let mut pending = Vec::with_capacity(batch.len());
        for info in batch {
            if info.failed {
                aggregator.stats.failed_transactions += 1;
            } else {
                pending.push(info);
            }
        }
        if pending.is_empty() {
            continue;
        }

        let fetches = pending.iter().map(|info| source.get_transaction_record(&info.signature));
        match try_join_all(fetches).await {
            Ok(records) => {
                for (info, record) in pending.iter().zip(records) {
                    aggregator.record_transaction(&record, info.block_time);
                }
            }
            Err(e) => {
                warn!("Skipping batch of {} transactions: {:?}", pending.len(), e);
                aggregator.stats.failed_batches += 1;
            }
        }
    }

    Ok(aggregator.finish())
}

fn log_parts(log: &str) -> Vec<&str> {
    log.split_whitespace().collect()
}

fn is_program_invoke(log: &str) -> bool {
    let parts = log_parts(log);
    parts.len() >= 3 && parts[0] == "Program" && parts[2] == "invoke"
}

fn is_program_success(log: &str) -> bool {
    let parts = log_parts(log);
    parts.len() == 3 && parts[0] == "Program" && parts[2] == "success"
}

fn is_program_failure(log: &str) -> bool {
    let parts = log_parts(log);
    parts.len() >= 3 && parts[0] == "Program" && parts[2].starts_with("failed")
}

fn is_program_data(log: &str) -> bool {
    log.starts_with("Program data: ")
}

fn get_program_id(log: &str) -> Option<Pubkey> {
    let parts = log_parts(log);
    if parts.len() >= 3 {
        return parts[1].parse::<Pubkey>().ok();
    }
    None
}

fn get_event_data(log: &str) -> Option<Vec<u8>> {
    let encoded_data = log.strip_prefix("Program data: ")?;
    base64::decode(encoded_data.trim()).ok()
}
