pub mod caching;
pub mod frankfurter;
pub mod steam_market;

pub use caching::{CachePolicy, Freshness, Lookup, PriceCacheService};
pub use frankfurter::FrankfurterProvider;
pub use steam_market::SteamMarketProvider;
