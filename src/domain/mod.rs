// Price history domain
pub mod market;

// Forecast types, scaling and strategy identifiers
pub mod ml;

// Port interfaces
pub mod ports;

// Domain-specific error types
pub mod errors;
