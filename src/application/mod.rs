// Forecasting strategies, their registry and the shared artifact cache
pub mod ml;
