pub mod network;
pub mod optimizer;
pub mod rollout;
pub mod strategy;

pub use network::{NetworkShape, SequenceNetwork, TrainingParams};
pub use rollout::{OneStepModel, rollout, rollout_step};
pub use strategy::{SequenceConfig, SequenceStrategy};
