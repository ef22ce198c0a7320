//! Quote lookup: cache first, then a rate limited fetch from the provider.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tokio::sync::broadcast;

use crate::{
    cache::QuoteCache,
    config::App,
    crawler::{serpapi::SerpApi, QuoteSource},
    declare::Quote,
    error::QuoteError,
    logging,
    ratelimit::RateLimiter,
};

type Outcome = Result<Quote, QuoteError>;

type InFlightMap = Mutex<HashMap<String, broadcast::Sender<Outcome>>>;

/// Owns the cache and the rate limiter for one provider.
///
/// Concurrent misses for the same symbol are coalesced: only the first caller
/// fetches, the rest receive its result, failures included.
pub struct QuoteService {
    source: Arc<dyn QuoteSource>,
    cache: QuoteCache,
    limiter: RateLimiter,
    /// 每個 symbol 最多一個進行中的抓取，其他請求訂閱其結果
    in_flight: InFlightMap,
}

/// What a caller does after a cache miss.
enum Turn<'a> {
    Leader(InFlight<'a>),
    Waiter(broadcast::Receiver<Outcome>),
}

/// The leader's claim on a symbol's in-flight entry.
///
/// The entry is removed when the result is published, or on drop if the
/// leader is cancelled first; waiters then see the channel close.
struct InFlight<'a> {
    map: &'a InFlightMap,
    symbol: String,
    finished: bool,
}

impl InFlight<'_> {
    fn finish(mut self, outcome: &Outcome) {
        self.finished = true;
        if let Some(sender) = lock(self.map).remove(&self.symbol) {
            // 沒有等待者時 send 會回傳 Err
            let _ = sender.send(outcome.clone());
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.finished {
            lock(self.map).remove(&self.symbol);
        }
    }
}

/// The map only holds senders, so a poisoned lock is still usable.
fn lock(map: &InFlightMap) -> MutexGuard<'_, HashMap<String, broadcast::Sender<Outcome>>> {
    map.lock().unwrap_or_else(PoisonError::into_inner)
}

impl QuoteService {
    pub fn new(source: Arc<dyn QuoteSource>, cache: QuoteCache, limiter: RateLimiter) -> Self {
        QuoteService {
            source,
            cache,
            limiter,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// SerpApi provider, cache TTL and rate limit taken from the settings.
    pub fn from_settings(settings: &App) -> Self {
        QuoteService::new(
            Arc::new(SerpApi::from_settings(settings)),
            QuoteCache::new(settings.quote.cache_ttl()),
            RateLimiter::new(
                settings.quote.rate_limit_permits,
                settings.quote.rate_limit_period(),
            ),
        )
    }

    pub fn cache(&self) -> &QuoteCache {
        &self.cache
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Returns the quote for `symbol`, case-insensitively.
    ///
    /// A fresh cache entry is returned without touching the network or the rate
    /// limiter. Failures are returned as they are, without retry and without
    /// falling back to stale data.
    pub async fn get_quote(&self, symbol: &str) -> Result<Quote, QuoteError> {
        let symbol = normalize_symbol(symbol);
        if symbol.is_empty() {
            return Err(QuoteError::InvalidSymbol);
        }

        if let Some(quote) = self.cache.get(&symbol) {
            logging::debug_file_async(format!("quote cache hit {}", symbol));
            return Ok(quote);
        }

        loop {
            match self.join(&symbol) {
                Turn::Leader(flight) => {
                    // 取得領頭權前可能已由其他請求寫入快取
                    let outcome = match self.cache.get(&symbol) {
                        Some(quote) => Ok(quote),
                        None => self.fetch_and_store(&symbol).await,
                    };
                    flight.finish(&outcome);
                    return outcome;
                }
                Turn::Waiter(mut receiver) => match receiver.recv().await {
                    Ok(outcome) => return outcome,
                    // 領頭的請求被取消，重新排隊
                    Err(_) => continue,
                },
            }
        }
    }

    async fn fetch_and_store(&self, symbol: &str) -> Result<Quote, QuoteError> {
        self.limiter.acquire().await;

        match self.source.fetch_quote(symbol).await {
            Ok(quote) => {
                logging::info_file_async(format!("fetched quote {:?}", quote));
                self.cache.put(symbol.to_string(), quote.clone());
                Ok(quote)
            }
            Err(why) => {
                logging::warn_file_async(format!(
                    "Failed to fetch quote {} ({}) because {}",
                    symbol,
                    why.kind(),
                    why
                ));
                Err(why)
            }
        }
    }

    fn join(&self, symbol: &str) -> Turn<'_> {
        let mut map = lock(&self.in_flight);
        if let Some(sender) = map.get(symbol) {
            return Turn::Waiter(sender.subscribe());
        }

        let (sender, _) = broadcast::channel(1);
        map.insert(symbol.to_string(), sender);
        Turn::Leader(InFlight {
            map: &self.in_flight,
            symbol: symbol.to_string(),
            finished: false,
        })
    }

    #[cfg(test)]
    fn in_flight_len(&self) -> usize {
        lock(&self.in_flight).len()
    }
}

/// Trims and uppercases a symbol so `" aapl "` and `"AAPL"` share one cache entry.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}
