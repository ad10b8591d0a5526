pub mod coingecko;
pub mod core;
pub mod persistence;

pub use coingecko::CoinGeckoMarketDataService;
pub use persistence::{FileArtifactStore, InMemoryArtifactStore};
