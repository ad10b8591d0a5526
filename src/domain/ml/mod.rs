pub mod forecast;
pub mod scaling;
pub mod strategy_kind;

pub use forecast::{FORECAST_HORIZON, Forecast};
pub use scaling::{MinMaxScaler, ScaledSeries};
pub use strategy_kind::StrategyKind;
