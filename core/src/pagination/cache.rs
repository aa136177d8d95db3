// Page cache keyed by criteria fingerprint

use super::Page;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

pub(crate) struct CachedPages<T> {
    pub pages: Vec<Page<T>>,
    pub fetched_at: Instant,
    pub fresh: bool,
}

struct CacheEntry<T> {
    pages: Vec<Page<T>>,
    // When page 0 was last fetched
    fetched_at: Instant,
    last_used: Instant,
}

/// Bounded cache of accumulated pages per criteria set.
///
/// Entries older than `stale_time` are still served, flagged stale, so the
/// caller can show them while refreshing.
pub(crate) struct QueryCache<T> {
    entries: HashMap<String, CacheEntry<T>>,
    capacity: usize,
    stale_time: Duration,
}

impl<T: Clone> QueryCache<T> {
    pub fn new(capacity: usize, stale_time: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: capacity.max(1),
            stale_time,
        }
    }

    pub fn lookup(&mut self, key: &str) -> Option<CachedPages<T>> {
        let stale_time = self.stale_time;
        let entry = self.entries.get_mut(key)?;
        entry.last_used = Instant::now();
        Some(CachedPages {
            pages: entry.pages.clone(),
            fetched_at: entry.fetched_at,
            fresh: entry.fetched_at.elapsed() < stale_time,
        })
    }

    pub fn store(&mut self, key: String, pages: Vec<Page<T>>, fetched_at: Instant) {
        let now = Instant::now();
        self.entries.insert(
            key,
            CacheEntry {
                pages,
                fetched_at,
                last_used: now,
            },
        );

        while self.entries.len() > self.capacity {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(k, _)| k.clone());
            match oldest {
                Some(k) => {
                    trace!(target: "coordinator", key = %k, "Evicting cached pages");
                    self.entries.remove(&k);
                }
                None => break,
            }
        }
    }

    pub fn is_stale(&self, fetched_at: Instant) -> bool {
        fetched_at.elapsed() >= self.stale_time
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_entries_go_stale() {
        let mut cache = QueryCache::new(4, Duration::from_secs(60));
        cache.store("a".into(), vec![Page::last(vec![1u32])], Instant::now());

        assert!(cache.lookup("a").unwrap().fresh);
        tokio::time::advance(Duration::from_secs(61)).await;
        let hit = cache.lookup("a").unwrap();
        assert!(!hit.fresh);
        assert_eq!(hit.pages[0].items, vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_evicts_least_recently_used() {
        let mut cache = QueryCache::new(2, Duration::from_secs(60));
        cache.store("a".into(), vec![Page::last(vec![1u32])], Instant::now());
        tokio::time::advance(Duration::from_millis(1)).await;
        cache.store("b".into(), vec![Page::last(vec![2u32])], Instant::now());
        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(cache.lookup("a").is_some());
        tokio::time::advance(Duration::from_millis(1)).await;
        cache.store("c".into(), vec![Page::last(vec![3u32])], Instant::now());

        assert_eq!(cache.len(), 2);
        assert!(cache.lookup("a").is_some());
        assert!(cache.lookup("b").is_none());
    }
}
