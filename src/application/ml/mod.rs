pub mod artifact_cache;
pub mod registry;
pub mod seasonal;
pub mod sequence;
pub mod strategy;
pub mod trend;

pub use artifact_cache::ArtifactCache;
pub use registry::ForecastRegistry;
pub use seasonal::{SeasonalModel, SeasonalStrategy};
pub use strategy::ForecastStrategy;
pub use trend::{TrendModel, TrendStrategy};
