//! Cache in front of the price and exchange-rate fetchers.
//!
//! Every lookup is served from cache while fresh, refreshed from the fetcher
//! once expired, and falls back to the last known value when that refresh
//! fails.

use crate::core::cache::{Cacheable, CacheEntry, Clock, SystemClock};
use crate::core::config::CacheConfig;
use crate::core::currency::{ExchangeRateProvider, ExchangeTable};
use crate::core::error::FetchError;
use crate::core::price::{PriceProvider, ProductPrice};
use chrono::Duration;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// How a looked-up value was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Served from cache within its ttl
    Cached,
    /// Fetched from upstream by this lookup
    Fetched,
    /// Refresh failed, served an expired cache entry
    Stale,
}

#[derive(Debug, Clone)]
pub struct Lookup<T> {
    pub value: T,
    pub freshness: Freshness,
}

impl<T> Lookup<T> {
    fn new(value: T, freshness: Freshness) -> Self {
        Self { value, freshness }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CachePolicy {
    pub product_ttl: Duration,
    pub exchange_ttl: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            product_ttl: Duration::minutes(60),
            exchange_ttl: Duration::minutes(120),
        }
    }
}

impl From<&CacheConfig> for CachePolicy {
    fn from(config: &CacheConfig) -> Self {
        Self {
            product_ttl: config.product_ttl(),
            exchange_ttl: config.exchange_ttl(),
        }
    }
}

/// Resolves a refresh attempt against the entry that was cached before it.
fn resolve<T: Cacheable>(
    what: &str,
    fetched: Result<T, FetchError>,
    previous: Option<CacheEntry<T>>,
) -> Result<Lookup<T>, FetchError> {
    match fetched {
        Ok(value) => Ok(Lookup::new(value, Freshness::Fetched)),
        Err(e) => match previous.filter(|entry| entry.value.is_valid()) {
            Some(entry) => {
                warn!(
                    error = %e,
                    "Refresh failed for {}, serving stale entry from {}",
                    what,
                    entry.stored_at
                );
                Ok(Lookup::new(entry.value, Freshness::Stale))
            }
            None => {
                warn!(error = %e, "Refresh failed for {} with nothing cached", what);
                Err(e)
            }
        },
    }
}

/// Caching front for a product price fetcher and an exchange-rate fetcher.
///
/// Product entries live in a sharded map so lookups for different products
/// never wait on each other. No lock is held while a fetch is in flight;
/// concurrent misses for the same key may both fetch, and the last store wins.
pub struct PriceCacheService<P, X> {
    prices: P,
    rates: X,
    policy: CachePolicy,
    clock: Arc<dyn Clock>,
    product_cache: DashMap<String, CacheEntry<ProductPrice>>,
    exchange_cache: RwLock<Option<CacheEntry<ExchangeTable>>>,
}

impl<P, X> PriceCacheService<P, X>
where
    P: PriceProvider,
    X: ExchangeRateProvider,
{
    pub fn new(prices: P, rates: X, policy: CachePolicy) -> Self {
        Self::with_clock(prices, rates, policy, Arc::new(SystemClock))
    }

    pub fn with_clock(prices: P, rates: X, policy: CachePolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            prices,
            rates,
            policy,
            clock,
            product_cache: DashMap::new(),
            exchange_cache: RwLock::new(None),
        }
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    pub async fn get_product_price(&self, name: &str) -> Result<ProductPrice, FetchError> {
        self.lookup_product_price(name).await.map(|l| l.value)
    }

    pub async fn get_exchange_table(&self) -> Result<ExchangeTable, FetchError> {
        self.lookup_exchange_table().await.map(|l| l.value)
    }

    pub async fn lookup_product_price(
        &self,
        name: &str,
    ) -> Result<Lookup<ProductPrice>, FetchError> {
        // Clone out so the shard guard is released before any await
        let cached = self.product_cache.get(name).map(|entry| entry.value().clone());

        if let Some(entry) = &cached {
            if entry.is_servable(self.policy.product_ttl, self.clock.now()) {
                debug!("Cache HIT for product: {}", name);
                return Ok(Lookup::new(entry.value.clone(), Freshness::Cached));
            }
            debug!("Cache EXPIRED for product: {}", name);
        } else {
            debug!("Cache MISS for product: {}", name);
        }

        let fetched = self.prices.fetch_product_price(name).await;
        if let Ok(price) = &fetched {
            self.product_cache.insert(
                name.to_string(),
                CacheEntry::new(price.clone(), self.clock.now()),
            );
            info!("Cached price for product: {}", name);
        }
        resolve(name, fetched, cached)
    }

    pub async fn lookup_exchange_table(&self) -> Result<Lookup<ExchangeTable>, FetchError> {
        let cached = self.exchange_cache.read().await.clone();

        if let Some(entry) = &cached {
            if entry.is_servable(self.policy.exchange_ttl, self.clock.now()) {
                debug!("Cache HIT for exchange rates");
                return Ok(Lookup::new(entry.value.clone(), Freshness::Cached));
            }
            debug!("Cache EXPIRED for exchange rates");
        } else {
            debug!("Cache MISS for exchange rates");
        }

        let fetched = self.rates.fetch_exchange_table().await;
        if let Ok(table) = &fetched {
            *self.exchange_cache.write().await =
                Some(CacheEntry::new(table.clone(), self.clock.now()));
            info!("Cached exchange rates");
        }
        resolve("exchange rates", fetched, cached)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cache::ManualClock;
    use crate::core::currency::Currency;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::Notify;

    struct MockPriceProvider {
        call_count: AtomicUsize,
        failing: AtomicBool,
        price: f64,
    }

    impl MockPriceProvider {
        fn new(price: f64) -> Self {
            Self {
                call_count: AtomicUsize::new(0),
                failing: AtomicBool::new(false),
                price,
            }
        }

        fn calls(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl<'a> PriceProvider for &'a MockPriceProvider {
        async fn fetch_product_price(&self, name: &str) -> Result<ProductPrice, FetchError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(FetchError::Upstream("HTTP error: 429".to_string()));
            }
            ProductPrice::new(name, self.price)
                .map_err(|e| FetchError::MalformedResponse(e.to_string()))
        }
    }

    struct MockRateProvider {
        call_count: AtomicUsize,
        failing: AtomicBool,
    }

    impl MockRateProvider {
        fn new() -> Self {
            Self {
                call_count: AtomicUsize::new(0),
                failing: AtomicBool::new(false),
            }
        }

        fn calls(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl<'a> ExchangeRateProvider for &'a MockRateProvider {
        async fn fetch_exchange_table(&self) -> Result<ExchangeTable, FetchError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(FetchError::MalformedResponse("not json".to_string()));
            }
            Ok(ExchangeTable::new(
                Currency::Usd,
                HashMap::from([(Currency::Czk, 23.5), (Currency::Eur, 0.92)]),
            )
            .unwrap())
        }
    }

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        ))
    }

    #[tokio::test]
    async fn test_product_price_cached_within_ttl() {
        let prices = MockPriceProvider::new(1.23);
        let rates = MockRateProvider::new();
        let clock = clock();
        let service =
            PriceCacheService::with_clock(&prices, &rates, CachePolicy::default(), clock.clone());

        let first = service.lookup_product_price("Kilowatt Case").await.unwrap();
        assert_eq!(first.value.price(), 1.23);
        assert_eq!(first.freshness, Freshness::Fetched);
        assert_eq!(prices.calls(), 1);

        clock.advance(Duration::minutes(5));
        let second = service.lookup_product_price("Kilowatt Case").await.unwrap();
        assert_eq!(second.value.price(), 1.23);
        assert_eq!(second.freshness, Freshness::Cached);
        assert_eq!(prices.calls(), 1);

        // Different key is a separate entry
        service.get_product_price("Gamma Case").await.unwrap();
        assert_eq!(prices.calls(), 2);
    }

    #[tokio::test]
    async fn test_expired_product_price_falls_back_to_stale() {
        let prices = MockPriceProvider::new(1.23);
        let rates = MockRateProvider::new();
        let clock = clock();
        let service =
            PriceCacheService::with_clock(&prices, &rates, CachePolicy::default(), clock.clone());

        service.get_product_price("Kilowatt Case").await.unwrap();

        clock.advance(Duration::minutes(61));
        prices.set_failing(true);
        let stale = service.lookup_product_price("Kilowatt Case").await.unwrap();
        assert_eq!(prices.calls(), 2);
        assert_eq!(stale.value.price(), 1.23);
        assert_eq!(stale.freshness, Freshness::Stale);

        // Once upstream recovers the entry is refreshed
        prices.set_failing(false);
        let fresh = service.lookup_product_price("Kilowatt Case").await.unwrap();
        assert_eq!(fresh.freshness, Freshness::Fetched);
        assert_eq!(prices.calls(), 3);
    }

    #[tokio::test]
    async fn test_expired_product_price_is_refetched() {
        let prices = MockPriceProvider::new(1.23);
        let rates = MockRateProvider::new();
        let clock = clock();
        let service =
            PriceCacheService::with_clock(&prices, &rates, CachePolicy::default(), clock.clone());

        service.get_product_price("Kilowatt Case").await.unwrap();
        clock.advance(Duration::minutes(61));
        let refreshed = service.lookup_product_price("Kilowatt Case").await.unwrap();
        assert_eq!(refreshed.freshness, Freshness::Fetched);
        assert_eq!(prices.calls(), 2);

        // The refreshed entry restarts the ttl
        clock.advance(Duration::minutes(30));
        let cached = service.lookup_product_price("Kilowatt Case").await.unwrap();
        assert_eq!(cached.freshness, Freshness::Cached);
        assert_eq!(prices.calls(), 2);
    }

    #[tokio::test]
    async fn test_product_failure_without_cache_propagates() {
        let prices = MockPriceProvider::new(1.23);
        let rates = MockRateProvider::new();
        prices.set_failing(true);
        let service =
            PriceCacheService::with_clock(&prices, &rates, CachePolicy::default(), clock());

        let result = service.get_product_price("Kilowatt Case").await;
        assert!(matches!(result, Err(FetchError::Upstream(_))));

        // A failure is not cached
        prices.set_failing(false);
        service.get_product_price("Kilowatt Case").await.unwrap();
        assert_eq!(prices.calls(), 2);
    }

    #[tokio::test]
    async fn test_zero_ttl_forces_refresh() {
        let prices = MockPriceProvider::new(1.23);
        let rates = MockRateProvider::new();
        let policy = CachePolicy {
            product_ttl: Duration::zero(),
            exchange_ttl: Duration::minutes(-1),
        };
        let service = PriceCacheService::with_clock(&prices, &rates, policy, clock());

        service.get_product_price("Kilowatt Case").await.unwrap();
        service.get_product_price("Kilowatt Case").await.unwrap();
        assert_eq!(prices.calls(), 2);

        service.get_exchange_table().await.unwrap();
        service.get_exchange_table().await.unwrap();
        assert_eq!(rates.calls(), 2);
    }

    #[tokio::test]
    async fn test_exchange_table_cached_within_ttl() {
        let prices = MockPriceProvider::new(1.23);
        let rates = MockRateProvider::new();
        let clock = clock();
        let service =
            PriceCacheService::with_clock(&prices, &rates, CachePolicy::default(), clock.clone());

        let first = service.lookup_exchange_table().await.unwrap();
        assert_eq!(first.freshness, Freshness::Fetched);

        clock.advance(Duration::minutes(119));
        let second = service.lookup_exchange_table().await.unwrap();
        assert_eq!(second.freshness, Freshness::Cached);
        assert_eq!(second.value.rate(Currency::Czk), Ok(23.5));
        assert_eq!(rates.calls(), 1);

        clock.advance(Duration::minutes(2));
        let third = service.lookup_exchange_table().await.unwrap();
        assert_eq!(third.freshness, Freshness::Fetched);
        assert_eq!(rates.calls(), 2);
    }

    #[tokio::test]
    async fn test_exchange_table_stale_fallback() {
        let prices = MockPriceProvider::new(1.23);
        let rates = MockRateProvider::new();
        let clock = clock();
        let service =
            PriceCacheService::with_clock(&prices, &rates, CachePolicy::default(), clock.clone());

        service.get_exchange_table().await.unwrap();
        clock.advance(Duration::hours(5));
        rates.set_failing(true);

        let stale = service.lookup_exchange_table().await.unwrap();
        assert_eq!(stale.freshness, Freshness::Stale);
        assert_eq!(stale.value.base(), Currency::Usd);
        assert_eq!(rates.calls(), 2);
    }

    #[tokio::test]
    async fn test_exchange_failure_without_cache_propagates() {
        let prices = MockPriceProvider::new(1.23);
        let rates = MockRateProvider::new();
        rates.set_failing(true);
        let service =
            PriceCacheService::with_clock(&prices, &rates, CachePolicy::default(), clock());

        let result = service.get_exchange_table().await;
        assert!(matches!(result, Err(FetchError::MalformedResponse(_))));
    }

    struct BlockingPriceProvider {
        blocked: String,
        release: Notify,
    }

    #[async_trait]
    impl<'a> PriceProvider for &'a BlockingPriceProvider {
        async fn fetch_product_price(&self, name: &str) -> Result<ProductPrice, FetchError> {
            if name == self.blocked {
                self.release.notified().await;
            }
            ProductPrice::new(name, 1.0).map_err(|e| FetchError::MalformedResponse(e.to_string()))
        }
    }

    #[tokio::test]
    async fn test_in_flight_fetch_does_not_block_other_keys() {
        let prices = BlockingPriceProvider {
            blocked: "Kilowatt Case".to_string(),
            release: Notify::new(),
        };
        let rates = MockRateProvider::new();
        let service = PriceCacheService::new(&prices, &rates, CachePolicy::default());
        let limit = std::time::Duration::from_secs(1);

        let (slow, (other, table)) = tokio::join!(
            service.get_product_price("Kilowatt Case"),
            async {
                // Both resolve while the first fetch is still parked
                let other = tokio::time::timeout(limit, service.get_product_price("Gamma Case"))
                    .await
                    .expect("lookup for another key was blocked");
                let table = tokio::time::timeout(limit, service.get_exchange_table())
                    .await
                    .expect("exchange lookup was blocked");
                prices.release.notify_one();
                (other, table)
            }
        );

        assert_eq!(other.unwrap().name(), "Gamma Case");
        assert!(table.is_ok());
        assert_eq!(slow.unwrap().name(), "Kilowatt Case");
    }
}
