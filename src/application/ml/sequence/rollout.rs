//! Autoregressive rollout of a one-step model.
//!
//! Each step feeds the model's own prediction back in, so errors compound
//! over the horizon. Accuracy therefore degrades toward the last days of
//! the forecast.

use super::network::SequenceNetwork;

/// A model that predicts the value following a window.
pub trait OneStepModel {
    fn predict_next(&self, window: &[f64]) -> f64;
}

impl OneStepModel for SequenceNetwork {
    fn predict_next(&self, window: &[f64]) -> f64 {
        self.predict(window)
    }
}

/// Predict one value and return it with the window shifted by one: the
/// oldest value dropped and the prediction appended.
pub fn rollout_step<M: OneStepModel + ?Sized>(window: &[f64], model: &M) -> (f64, Vec<f64>) {
    let next = model.predict_next(window);
    let mut next_window = Vec::with_capacity(window.len());
    if let Some(rest) = window.get(1..) {
        next_window.extend_from_slice(rest);
    }
    next_window.push(next);
    (next, next_window)
}

/// Apply [`rollout_step`] `steps` times starting from `seed`.
pub fn rollout<M: OneStepModel + ?Sized>(seed: &[f64], model: &M, steps: usize) -> Vec<f64> {
    let mut predictions = Vec::with_capacity(steps);
    let mut window = seed.to_vec();
    for _ in 0..steps {
        let (next, next_window) = rollout_step(&window, model);
        predictions.push(next);
        window = next_window;
    }
    predictions
}
