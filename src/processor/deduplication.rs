//! Record deduplication
//!
//! Collapses records sharing an [`IdentityKey`] to a single survivor: the
//! record with the latest parseable expiry date. Survivors keep the order in
//! which their key first appeared.

use crate::constants::DATE_OUTPUT_FORMAT;
use crate::models::{Deduplicate, IdentityKey};
use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::{debug, info};

/// Survivors plus counters
#[derive(Debug, Clone)]
pub struct DeduplicationResult<R> {
    pub records: Vec<R>,
    pub groups: usize,
    pub duplicates_removed: usize,
}

/// Keep one record per identity key
pub fn deduplicate<R: Deduplicate>(records: Vec<R>) -> DeduplicationResult<R> {
    let input_count = records.len();
    let mut positions: HashMap<IdentityKey, usize> = HashMap::with_capacity(input_count);
    let mut winners: Vec<R> = Vec::with_capacity(input_count);

    for record in records {
        let key = record.identity_key();
        match positions.get(&key) {
            Some(&index) => {
                if supersedes(record.expiry(), winners[index].expiry()) {
                    debug!(
                        "Replacing '{}' / '{}': expiry {} beats {}",
                        key.person,
                        key.cert_name,
                        record.expiry(),
                        winners[index].expiry()
                    );
                    winners[index] = record;
                }
            }
            None => {
                positions.insert(key, winners.len());
                winners.push(record);
            }
        }
    }

    let duplicates_removed = input_count - winners.len();
    if duplicates_removed > 0 {
        info!(
            "Deduplication kept {} of {} records ({} duplicates removed)",
            winners.len(),
            input_count,
            duplicates_removed
        );
    }

    DeduplicationResult {
        groups: winners.len(),
        records: winners,
        duplicates_removed,
    }
}

fn parse_expiry(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_OUTPUT_FORMAT).ok()
}

/// A parseable date beats an unparseable one and a later date beats an
/// earlier one. Anything else keeps the current winner.
fn supersedes(candidate: &str, current: &str) -> bool {
    match (parse_expiry(candidate), parse_expiry(current)) {
        (Some(_), None) => true,
        (Some(new), Some(old)) => new > old,
        _ => false,
    }
}
