use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::record::{has_value, Record};

/// Counts from one merge, for the summary log line.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub added: usize,
    pub updated: usize,
    pub carried: usize,
}

/// Merge freshly extracted records into an existing collection keyed by `hls_url`.
///
/// For keys on both sides the existing record wins field by field wherever it
/// has a value, so a hand-edited `get` flag survives a re-scrape. Existing
/// keys missing from `new` are carried forward. Output order is new keys in
/// first-seen order, then existing-only keys, then keyless existing rows.
pub fn merge(existing: &[Record], new: &[Record]) -> (Vec<Record>, MergeStats) {
    let mut stats = MergeStats::default();

    let mut existing_by_url: HashMap<&str, &Record> = HashMap::new();
    let mut existing_order: Vec<&str> = Vec::new();
    let mut keyless: Vec<Record> = Vec::new();
    for record in existing {
        if !record.has_key() {
            keyless.push(record.clone());
            continue;
        }
        // First occurrence wins on the existing side.
        if !existing_by_url.contains_key(record.hls_url.as_str()) {
            existing_by_url.insert(&record.hls_url, record);
            existing_order.push(&record.hls_url);
        }
    }

    let mut new_by_url: HashMap<&str, &Record> = HashMap::new();
    let mut new_order: Vec<&str> = Vec::new();
    for record in new.iter().filter(|r| r.has_key()) {
        if new_by_url.insert(&record.hls_url, record).is_none() {
            new_order.push(&record.hls_url);
        }
    }

    let mut merged = Vec::with_capacity(existing.len() + new_order.len());
    for url in &new_order {
        let fresh = new_by_url[url];
        match existing_by_url.get(url) {
            Some(prior) => {
                merged.push(overlay(fresh, prior));
                stats.updated += 1;
            }
            None => {
                merged.push(fresh.clone());
                stats.added += 1;
            }
        }
    }

    let seen: HashSet<&str> = new_order.iter().copied().collect();
    for url in existing_order.iter().filter(|u| !seen.contains(*u)) {
        merged.push(existing_by_url[url].clone());
        stats.carried += 1;
    }

    if !keyless.is_empty() {
        debug!("Carrying {} existing rows without hls_url", keyless.len());
    }
    merged.extend(keyless);

    (merged, stats)
}

/// `fresh` with every non-empty field of `prior` laid over it. `get` always comes from `prior`.
fn overlay(fresh: &Record, prior: &Record) -> Record {
    let pick = |new: &String, old: &String| if old.is_empty() { new.clone() } else { old.clone() };

    let mut extra = fresh.extra.clone();
    for (key, value) in &prior.extra {
        if has_value(value) || !extra.contains_key(key) {
            extra.insert(key.clone(), value.clone());
        }
    }

    Record {
        title: pick(&fresh.title, &prior.title),
        broadcast_date: pick(&fresh.broadcast_date, &prior.broadcast_date),
        broadcast_start: pick(&fresh.broadcast_start, &prior.broadcast_start),
        hls_url: fresh.hls_url.clone(),
        get: prior.get,
        extra,
    }
}
