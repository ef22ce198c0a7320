//! 報價快取。
//!
//! 以 symbol 為 key 保存最近一次成功取得的 [`Quote`]，並記錄寫入時間。
//! 過期判斷採惰性方式：讀取時才比對 TTL，過期的項目直接視為不存在，
//! 但不會主動刪除，下一次成功抓取會覆蓋它。

use std::{collections::HashMap, sync::RwLock, time::Duration};

use tokio::time::Instant;

use crate::{declare::Quote, logging};

/// 快取項目。
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: Quote,
    pub stored_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.stored_at) < ttl
    }
}

/// Per-symbol quote cache with a fixed time-to-live.
///
/// The clock is `tokio::time::Instant`, so a paused runtime controls expiry.
/// Lock failures never panic: a poisoned lock reads as a miss and skips the write.
pub struct QuoteCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl QuoteCache {
    pub fn new(ttl: Duration) -> Self {
        QuoteCache {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// 取得尚未過期的報價
    pub fn get(&self, key: &str) -> Option<Quote> {
        let now = Instant::now();
        match self.entries.read() {
            Ok(cache) => cache
                .get(key)
                .filter(|entry| entry.is_fresh(now, self.ttl))
                .map(|entry| entry.value.clone()),
            Err(why) => {
                logging::error_file_async(format!(
                    "Failed to read quote cache because {:?}",
                    why
                ));
                None
            }
        }
    }

    /// 寫入或覆蓋報價，寫入時間為現在
    pub fn put(&self, key: String, value: Quote) {
        match self.entries.write() {
            Ok(mut cache) => {
                cache.insert(
                    key,
                    CacheEntry {
                        value,
                        stored_at: Instant::now(),
                    },
                );
            }
            Err(why) => {
                logging::error_file_async(format!(
                    "Failed to write quote cache because {:?}",
                    why
                ));
            }
        }
    }

    /// Number of stored entries, stale ones included.
    pub fn len(&self) -> usize {
        match self.entries.read() {
            Ok(cache) => cache.len(),
            Err(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn quote(symbol: &str) -> Quote {
        Quote::new(symbol, Some(dec!(10.5).into()), Some("t".to_string()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_within_ttl() {
        let cache = QuoteCache::new(Duration::from_secs(60));
        assert_eq!(cache.get("AAPL"), None);

        cache.put("AAPL".to_string(), quote("AAPL"));
        tokio::time::advance(Duration::from_secs(59)).await;

        assert_eq!(cache.get("AAPL"), Some(quote("AAPL")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_entry_is_ignored_not_removed() {
        let cache = QuoteCache::new(Duration::from_secs(60));
        cache.put("AAPL".to_string(), quote("AAPL"));

        tokio::time::advance(Duration::from_secs(60)).await;

        assert_eq!(cache.get("AAPL"), None);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_put_overwrites_and_restarts_ttl() {
        let cache = QuoteCache::new(Duration::from_secs(60));
        cache.put("AAPL".to_string(), quote("AAPL"));

        tokio::time::advance(Duration::from_secs(50)).await;
        let newer = Quote::new("AAPL", Some(dec!(11).into()), None);
        cache.put("AAPL".to_string(), newer.clone());

        tokio::time::advance(Duration::from_secs(50)).await;
        assert_eq!(cache.get("AAPL"), Some(newer));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_keys_are_exact() {
        tokio_test::block_on(async {
            let cache = QuoteCache::new(Duration::from_secs(60));
            cache.put("AAPL".to_string(), quote("AAPL"));

            assert!(cache.get("aapl").is_none());
            assert!(!cache.is_empty());
        });
    }
}
