use crate::core::currency::ExchangeTable;
use crate::core::price::ProductPrice;
use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;

/// Source of the current time for cache timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Values that can be checked for sanity before being served from cache.
pub trait Cacheable: Clone + Send + Sync {
    fn is_valid(&self) -> bool;
}

impl Cacheable for ProductPrice {
    fn is_valid(&self) -> bool {
        !self.name().is_empty() && self.price().is_finite() && self.price() >= 0.0
    }
}

impl Cacheable for ExchangeTable {
    fn is_valid(&self) -> bool {
        self.rates().values().all(|rate| *rate > 0.0)
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    pub stored_at: DateTime<Utc>,
}

impl<T: Cacheable> CacheEntry<T> {
    pub fn new(value: T, stored_at: DateTime<Utc>) -> Self {
        Self { value, stored_at }
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.stored_at
    }

    /// Fresh while `now` is strictly before `stored_at + ttl`, so a zero or
    /// negative ttl is never fresh.
    pub fn is_fresh(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        now < self.stored_at + ttl
    }

    /// An entry may be served without a refresh only when fresh and valid.
    pub fn is_servable(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        self.is_fresh(ttl, now) && self.value.is_valid()
    }
}
