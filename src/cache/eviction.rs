//! Size and age based eviction
//!
//! Entries carry no access time, so `created_at` (refreshed on touch) stands
//! in for recency. Size eviction always removes the oldest entries first.

use crate::cache::store::CacheEntry;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Whether an entry created at `created_at` has outlived `ttl`
pub fn is_expired(created_at: DateTime<Utc>, ttl: Duration, now: DateTime<Utc>) -> bool {
    match chrono::Duration::from_std(ttl) {
        Ok(ttl) => now - created_at > ttl,
        // A TTL too large for chrono never expires anything
        Err(_) => false,
    }
}

/// Remove every entry older than `ttl`, returning the expired entries
pub fn expire_older_than<E: CacheEntry>(
    entries: &mut Vec<E>,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Vec<E> {
    let (expired, kept): (Vec<E>, Vec<E>) = std::mem::take(entries)
        .into_iter()
        .partition(|e| is_expired(e.created_at(), ttl, now));
    *entries = kept;
    expired
}

/// Remove the oldest entries until the summed footprint fits `max_bytes`
///
/// Returns the evicted entries. Remaining entries keep their relative order.
/// If no subset of the newest entries fits, every entry is removed.
pub fn evict_to_budget<E: CacheEntry>(entries: &mut Vec<E>, max_bytes: u64) -> Vec<E> {
    let mut total: u64 = entries.iter().map(CacheEntry::footprint).sum();
    if total <= max_bytes {
        return Vec::new();
    }

    let mut oldest_first: Vec<usize> = (0..entries.len()).collect();
    oldest_first.sort_by_key(|&i| entries[i].created_at());

    let mut doomed = vec![false; entries.len()];
    for i in oldest_first {
        if total <= max_bytes {
            break;
        }
        total = total.saturating_sub(entries[i].footprint());
        doomed[i] = true;
    }

    let mut evicted = Vec::new();
    let mut kept = Vec::with_capacity(entries.len());
    for (i, entry) in std::mem::take(entries).into_iter().enumerate() {
        if doomed[i] {
            evicted.push(entry);
        } else {
            kept.push(entry);
        }
    }
    *entries = kept;
    evicted
}
