//! Model configuration parsing from environment variables.
//!
//! This module handles the artifact directory and the sequence network
//! hyperparameters.

use crate::application::ml::sequence::{NetworkShape, SequenceConfig, TrainingParams};
use anyhow::{Context, Result, ensure};
use std::env;
use std::path::PathBuf;

/// Model environment configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ModelEnvConfig {
    pub model_dir: PathBuf,

    // Sequence network
    pub sequence_window: usize,
    pub sequence_lstm_units: usize,
    pub sequence_dense_units: usize,

    // Sequence training
    pub sequence_epochs: usize,
    pub sequence_learning_rate: f64,
    pub sequence_seed: u64,
    pub sequence_train_fraction: f64,
}

impl Default for ModelEnvConfig {
    fn default() -> Self {
        let shape = NetworkShape::default();
        let training = TrainingParams::default();
        Self {
            model_dir: PathBuf::from("models"),
            sequence_window: shape.window,
            sequence_lstm_units: shape.lstm_units,
            sequence_dense_units: shape.dense_units,
            sequence_epochs: training.epochs,
            sequence_learning_rate: training.learning_rate,
            sequence_seed: training.seed,
            sequence_train_fraction: training.train_fraction,
        }
    }
}

impl ModelEnvConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            model_dir: env::var("MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_dir),
            sequence_window: Self::parse_usize("SEQUENCE_WINDOW", defaults.sequence_window)?,
            sequence_lstm_units: Self::parse_usize(
                "SEQUENCE_LSTM_UNITS",
                defaults.sequence_lstm_units,
            )?,
            sequence_dense_units: Self::parse_usize(
                "SEQUENCE_DENSE_UNITS",
                defaults.sequence_dense_units,
            )?,
            sequence_epochs: Self::parse_usize("SEQUENCE_EPOCHS", defaults.sequence_epochs)?,
            sequence_learning_rate: Self::parse_f64(
                "SEQUENCE_LEARNING_RATE",
                defaults.sequence_learning_rate,
            )?,
            sequence_seed: env::var("SEQUENCE_SEED")
                .unwrap_or_else(|_| defaults.sequence_seed.to_string())
                .parse::<u64>()
                .context("Failed to parse SEQUENCE_SEED")?,
            sequence_train_fraction: Self::parse_f64(
                "SEQUENCE_TRAIN_FRACTION",
                defaults.sequence_train_fraction,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        ensure!(self.sequence_window > 0, "SEQUENCE_WINDOW must be positive");
        ensure!(
            self.sequence_lstm_units > 0,
            "SEQUENCE_LSTM_UNITS must be positive"
        );
        ensure!(
            self.sequence_dense_units > 0,
            "SEQUENCE_DENSE_UNITS must be positive"
        );
        ensure!(self.sequence_epochs > 0, "SEQUENCE_EPOCHS must be positive");
        ensure!(
            self.sequence_learning_rate.is_finite() && self.sequence_learning_rate > 0.0,
            "SEQUENCE_LEARNING_RATE must be a positive number"
        );
        ensure!(
            self.sequence_train_fraction > 0.0 && self.sequence_train_fraction <= 1.0,
            "SEQUENCE_TRAIN_FRACTION must be in (0, 1]"
        );
        Ok(())
    }

    pub fn sequence_config(&self) -> SequenceConfig {
        SequenceConfig {
            shape: NetworkShape {
                window: self.sequence_window,
                lstm_units: self.sequence_lstm_units,
                dense_units: self.sequence_dense_units,
            },
            training: TrainingParams {
                epochs: self.sequence_epochs,
                learning_rate: self.sequence_learning_rate,
                seed: self.sequence_seed,
                train_fraction: self.sequence_train_fraction,
            },
        }
    }

    fn parse_usize(key: &str, default: usize) -> Result<usize> {
        env::var(key)
            .unwrap_or_else(|_| default.to_string())
            .parse::<usize>()
            .context(format!("Failed to parse {}", key))
    }

    fn parse_f64(key: &str, default: f64) -> Result<f64> {
        env::var(key)
            .unwrap_or_else(|_| default.to_string())
            .parse::<f64>()
            .context(format!("Failed to parse {}", key))
    }
}
