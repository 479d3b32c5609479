//! Time-bounded caches.
//!
//! [`TtlCache`] knows nothing about expeditions: callers pass the current
//! time, so expiry and sweeping are deterministic in tests.
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::hash::Hash;

use crate::config::CacheConfig;
use crate::generator::ExpeditionOption;

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    stored_at: DateTime<Utc>,
}

/// Map whose entries expire `ttl` after insertion.
#[derive(Debug, Clone)]
pub struct TtlCache<K, V> {
    entries: HashMap<K, Entry<V>>,
    ttl: Duration,
    sweep_interval: Duration,
    last_sweep: Option<DateTime<Utc>>,
}

impl<K: Eq + Hash, V> TtlCache<K, V> {
    #[must_use]
    pub fn new(ttl: Duration, sweep_interval: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            sweep_interval,
            last_sweep: None,
        }
    }

    fn is_expired(&self, stored_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now - stored_at >= self.ttl
    }

    /// Insert or replace the entry for `key`.
    pub fn set(&mut self, key: K, value: V, now: DateTime<Utc>) {
        self.entries.insert(
            key,
            Entry {
                value,
                stored_at: now,
            },
        );
    }

    /// Live value for `key`; an expired entry is evicted and reported missing.
    pub fn get(&mut self, key: &K, now: DateTime<Utc>) -> Option<&V> {
        let expired = self
            .entries
            .get(key)
            .is_some_and(|entry| self.is_expired(entry.stored_at, now));
        if expired {
            self.entries.remove(key);
            return None;
        }
        self.entries.get(key).map(|entry| &entry.value)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|entry| entry.value)
    }

    /// Drop every expired entry, returning how many were evicted.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries.retain(|_, entry| now - entry.stored_at < ttl);
        self.last_sweep = Some(now);
        before - self.entries.len()
    }

    /// Run [`Self::sweep`] if the sweep interval has elapsed since the last one.
    pub fn maybe_sweep(&mut self, now: DateTime<Utc>) -> Option<usize> {
        let due = self
            .last_sweep
            .is_none_or(|last| now - last >= self.sweep_interval);
        due.then(|| self.sweep(now))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Options proposed to one player and not yet selected.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingChoices {
    pub options: Vec<ExpeditionOption>,
}

/// Per-player store of the latest option set.
#[derive(Debug, Clone)]
pub struct PendingChoiceCache {
    inner: TtlCache<u64, PendingChoices>,
}

impl PendingChoiceCache {
    #[must_use]
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            inner: TtlCache::new(config.ttl(), config.sweep_interval()),
        }
    }

    pub fn set(&mut self, player_id: u64, options: Vec<ExpeditionOption>, now: DateTime<Utc>) {
        self.inner.set(player_id, PendingChoices { options }, now);
    }

    pub fn get(&mut self, player_id: u64, now: DateTime<Utc>) -> Option<&PendingChoices> {
        self.inner.get(&player_id, now)
    }

    pub fn find_by_id(
        &mut self,
        player_id: u64,
        option_id: u64,
        now: DateTime<Utc>,
    ) -> Option<&ExpeditionOption> {
        self.get(player_id, now)?
            .options
            .iter()
            .find(|option| option.id == option_id)
    }

    pub fn delete(&mut self, player_id: u64) -> bool {
        self.inner.remove(&player_id).is_some()
    }

    pub fn maybe_sweep(&mut self, now: DateTime<Utc>) -> Option<usize> {
        let evicted = self.inner.maybe_sweep(now);
        if let Some(count) = evicted.filter(|count| *count > 0) {
            log::debug!("swept {count} expired expedition proposals");
        }
        evicted
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::LocationType;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn option(id: u64) -> ExpeditionOption {
        ExpeditionOption {
            id,
            duration_minutes: 60,
            display_duration_minutes: 60,
            risk_rate: 10,
            difficulty: 10,
            wealth_rate: 1.0,
            location_type: LocationType::Plains,
            map_location_id: Some(1),
            food_cost: 1,
            reward_index: 0,
            is_distant: false,
            has_clone_talisman_bonus: false,
            has_bonus_tokens: false,
        }
    }

    #[test]
    fn get_lazily_evicts_expired_entries() {
        let mut cache = TtlCache::new(Duration::minutes(10), Duration::minutes(5));
        cache.set("a", 1, t0());
        assert_eq!(cache.get(&"a", t0() + Duration::minutes(9)), Some(&1));
        assert_eq!(cache.get(&"a", t0() + Duration::minutes(10)), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn set_replaces_and_refreshes() {
        let mut cache = TtlCache::new(Duration::minutes(10), Duration::minutes(5));
        cache.set(1_u64, "old", t0());
        cache.set(1_u64, "new", t0() + Duration::minutes(8));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&1, t0() + Duration::minutes(15)), Some(&"new"));
    }

    #[test]
    fn sweep_removes_only_expired_entries() {
        let mut cache = TtlCache::new(Duration::minutes(10), Duration::minutes(5));
        cache.set(1_u64, (), t0());
        cache.set(2_u64, (), t0() + Duration::minutes(6));
        assert_eq!(cache.sweep(t0() + Duration::minutes(11)), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn maybe_sweep_respects_interval() {
        let mut cache = TtlCache::new(Duration::minutes(10), Duration::minutes(5));
        cache.set(1_u64, (), t0());
        assert_eq!(cache.maybe_sweep(t0()), Some(0));
        assert_eq!(cache.maybe_sweep(t0() + Duration::minutes(4)), None);
        assert_eq!(cache.maybe_sweep(t0() + Duration::minutes(11)), Some(1));
    }

    #[test]
    fn pending_cache_finds_options_by_id() {
        let mut cache = PendingChoiceCache::new(&CacheConfig::default());
        cache.set(7, vec![option(1), option(2)], t0());
        assert_eq!(cache.find_by_id(7, 2, t0()).map(|o| o.id), Some(2));
        assert!(cache.find_by_id(7, 3, t0()).is_none());
        assert!(cache.find_by_id(8, 1, t0()).is_none());
        assert!(cache.find_by_id(7, 1, t0() + Duration::minutes(10)).is_none());
    }

    #[test]
    fn pending_cache_delete_reports_presence() {
        let mut cache = PendingChoiceCache::new(&CacheConfig::default());
        cache.set(7, vec![option(1)], t0());
        assert!(cache.delete(7));
        assert!(!cache.delete(7));
        assert!(cache.is_empty());
    }
}
