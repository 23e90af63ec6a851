//! Compaction filters: the mechanism by which a data record's logical
//! deletion (a meta version bump, not a physical write to the data CF)
//! eventually reclaims the orphaned record's space. Every data CF registers
//! a filter that, for each record compaction visits, asks "does this
//! record's `(user_key, version)` still match the current meta, and is the
//! meta itself still alive?" — grounded on a compaction subsystem's split
//! between strategy-specific logic and shared execution primitives
//! (`dedup_records`, `finalize_compaction`); the shared primitive here is
//! [`resolve_parent_meta`], called by every filter instance.
//!
//! Filters never block on contended locks and never do unbounded work per
//! key: [`VersionCacheEntry`] lookups are served from a bounded LRU, and a
//! cache miss costs exactly one `store.get(Meta, user_key)` call.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use lru::LruCache;

use crate::format::data::DataParsed;
use crate::format::keys::{decode_key, decode_score_suffix, encode_field_key};
use crate::format::meta::{BaseMetaParsed, ListsMetaParsed, StringsParsed};
use crate::format::DataType;
use crate::store::{Cf, CompactionFilter, FilterDecision, Store};

/// Default capacity for a filter's version cache when the caller doesn't
/// have a more specific figure in mind.
pub const DEFAULT_VERSION_CACHE_CAPACITY: usize = 4096;

/// What a data-record filter needs to know about a key's current meta to
/// decide whether a given generation's data is still live.
#[derive(Debug, Clone, Copy)]
pub struct VersionCacheEntry {
    pub version: u64,
    pub etime: u64,
}

fn parse_meta_entry(raw: &[u8]) -> Option<VersionCacheEntry> {
    let data_type = DataType::from_byte(*raw.first()?)?;
    match data_type {
        DataType::Strings => {
            let p = StringsParsed::parse(raw).ok()?;
            Some(VersionCacheEntry {
                version: p.version().ok()?,
                etime: p.etime().ok()?,
            })
        }
        DataType::Lists => {
            let p = ListsMetaParsed::parse(raw).ok()?;
            Some(VersionCacheEntry {
                version: p.version().ok()?,
                etime: p.etime().ok()?,
            })
        }
        DataType::Hashes | DataType::Sets | DataType::ZSets | DataType::PKHashes => {
            let p = BaseMetaParsed::parse(raw).ok()?;
            Some(VersionCacheEntry {
                version: p.version().ok()?,
                etime: p.etime().ok()?,
            })
        }
        DataType::None => None,
    }
}

/// Resolves `user_key`'s current meta, consulting `cache` first. Returns
/// `None` if the key has no meta record at all — every data record under
/// it is orphaned.
pub fn resolve_parent_meta(
    cache: &Mutex<LruCache<Vec<u8>, VersionCacheEntry>>,
    store: &dyn Store,
    user_key: &[u8],
) -> Option<VersionCacheEntry> {
    if let Some(entry) = cache.lock().unwrap_or_else(|e| e.into_inner()).get(user_key) {
        return Some(*entry);
    }
    let raw = store.get(Cf::Meta, user_key, None).ok().flatten()?;
    let entry = parse_meta_entry(&raw)?;
    cache
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .put(user_key.to_vec(), entry);
    Some(entry)
}

fn new_cache(capacity: usize) -> Mutex<LruCache<Vec<u8>, VersionCacheEntry>> {
    let capacity = NonZeroUsize::new(capacity.max(1)).expect("capacity.max(1) is never zero");
    Mutex::new(LruCache::new(capacity))
}

/// Filter registered on [`Cf::Meta`] itself: drops a meta record once its
/// own TTL has elapsed. A stale meta is exactly as dead as an absent one,
/// as far as every data-record filter's `resolve_parent_meta` call is
/// concerned — so removing it here and falling through to "no meta found"
/// on the data side is what finally reclaims the whole key.
pub struct MetaFilter;

impl CompactionFilter for MetaFilter {
    fn decide(&self, _key: &[u8], value: &[u8], now: u64) -> FilterDecision {
        match parse_meta_entry(value) {
            Some(entry) if entry.etime != 0 && entry.etime <= now => FilterDecision::Drop,
            Some(_) => FilterDecision::Keep,
            // Malformed/foreign bytes: never destroy data we can't account for.
            None => FilterDecision::Keep,
        }
    }
}

/// Filter for a data CF whose keys are `{prefix}{suffix}` per
/// [`crate::format::keys`] — Hashes/Sets/ZSets-member/Lists/PKHash data all
/// share this shape, so one filter body serves every one of them; `decode_key`
/// already treats the suffix opaquely, so no per-CF specialization is
/// needed beyond the `check_field_etime` flag PKHashes sets.
pub struct DataFilter {
    store: Arc<dyn Store>,
    version_cache: Mutex<LruCache<Vec<u8>, VersionCacheEntry>>,
    /// PKHashes data records carry their own per-field `etime`
    /// (`PKHEXPIRE`); every other type's data-record `etime` is always 0
    /// and this check is a harmless no-op for them.
    check_field_etime: bool,
}

impl DataFilter {
    pub fn new(store: Arc<dyn Store>, capacity: usize, check_field_etime: bool) -> Self {
        Self {
            store,
            version_cache: new_cache(capacity),
            check_field_etime,
        }
    }
}

impl CompactionFilter for DataFilter {
    fn decide(&self, key: &[u8], value: &[u8], now: u64) -> FilterDecision {
        let Ok((user_key, version, _suffix)) = decode_key(key) else {
            return FilterDecision::Keep;
        };
        let Some(entry) = resolve_parent_meta(&self.version_cache, self.store.as_ref(), user_key) else {
            return FilterDecision::Drop;
        };
        if entry.version != version {
            return FilterDecision::Drop;
        }
        if entry.etime != 0 && entry.etime <= now {
            return FilterDecision::Drop;
        }
        if self.check_field_etime {
            if let Ok(parsed) = DataParsed::parse(value) {
                if matches!(parsed.is_stale(now), Ok(true)) {
                    return FilterDecision::Drop;
                }
            }
        }
        FilterDecision::Keep
    }
}

/// Filter for the ZSets score-ordered CF. In addition to the generic
/// version/staleness check every [`DataFilter`] does, a score record is
/// only meaningful while its member still has a live entry in the member
/// CF — `ZADD`/`ZREM` keep the two in lockstep on the write path, but a
/// crash between the two writes of a single logical update is exactly what
/// compaction is the backstop for.
pub struct ZsetsScoreFilter {
    store: Arc<dyn Store>,
    version_cache: Mutex<LruCache<Vec<u8>, VersionCacheEntry>>,
}

impl ZsetsScoreFilter {
    pub fn new(store: Arc<dyn Store>, capacity: usize) -> Self {
        Self {
            store,
            version_cache: new_cache(capacity),
        }
    }
}

impl CompactionFilter for ZsetsScoreFilter {
    fn decide(&self, key: &[u8], _value: &[u8], now: u64) -> FilterDecision {
        let Ok((user_key, version, suffix)) = decode_key(key) else {
            return FilterDecision::Keep;
        };
        let Some(entry) = resolve_parent_meta(&self.version_cache, self.store.as_ref(), user_key) else {
            return FilterDecision::Drop;
        };
        if entry.version != version {
            return FilterDecision::Drop;
        }
        if entry.etime != 0 && entry.etime <= now {
            return FilterDecision::Drop;
        }
        let Ok((_score, member)) = decode_score_suffix(suffix) else {
            return FilterDecision::Keep;
        };
        let member_key = encode_field_key(user_key, version, member);
        match self.store.get(Cf::ZsetsMember, &member_key, None) {
            Ok(Some(_)) => FilterDecision::Keep,
            _ => FilterDecision::Drop,
        }
    }
}

#[cfg(test)]
mod tests;
