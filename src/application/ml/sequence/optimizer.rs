use ndarray::{ArrayD, ArrayViewMutD, Zip};

/// Adam with Keras' default moments (β1 = 0.9, β2 = 0.999, ε = 1e-7).
pub struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    step: i32,
    first_moments: Vec<ArrayD<f64>>,
    second_moments: Vec<ArrayD<f64>>,
}

impl Adam {
    pub fn new(learning_rate: f64) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
            step: 0,
            first_moments: Vec::new(),
            second_moments: Vec::new(),
        }
    }

    /// Apply one update. `params` and `grads` must list the same tensors in
    /// the same order on every call.
    pub fn step(&mut self, params: Vec<ArrayViewMutD<'_, f64>>, grads: &[ArrayD<f64>]) {
        if self.first_moments.is_empty() {
            self.first_moments = grads.iter().map(|g| ArrayD::zeros(g.raw_dim())).collect();
            self.second_moments = grads.iter().map(|g| ArrayD::zeros(g.raw_dim())).collect();
        }

        self.step = self.step.saturating_add(1);
        let (lr, beta1, beta2, epsilon) = (self.learning_rate, self.beta1, self.beta2, self.epsilon);
        let bias_correction1 = 1.0 - beta1.powi(self.step);
        let bias_correction2 = 1.0 - beta2.powi(self.step);

        let moments = self.first_moments.iter_mut().zip(self.second_moments.iter_mut());
        for ((mut param, grad), (m, v)) in params.into_iter().zip(grads).zip(moments) {
            Zip::from(param.view_mut())
                .and(m)
                .and(v)
                .and(grad)
                .for_each(|p, m, v, &g| {
                    *m = beta1 * *m + (1.0 - beta1) * g;
                    *v = beta2 * *v + (1.0 - beta2) * g * g;
                    let m_hat = *m / bias_correction1;
                    let v_hat = *v / bias_correction2;
                    *p -= lr * m_hat / (v_hat.sqrt() + epsilon);
                });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{ArrayD, IxDyn};

    #[test]
    fn test_first_step_moves_by_learning_rate() {
        let mut weights = ArrayD::from_elem(IxDyn(&[2]), 1.0);
        let grads = vec![ArrayD::from_shape_vec(IxDyn(&[2]), vec![0.5, -2.0]).unwrap()];
        let mut adam = Adam::new(0.1);

        adam.step(vec![weights.view_mut()], &grads);

        // Bias-corrected first step is lr * sign(g).
        let w = weights.as_slice().unwrap();
        assert!((w[0] - 0.9).abs() < 1e-6);
        assert!((w[1] - 1.1).abs() < 1e-6);
    }

    #[test]
    fn test_minimises_quadratic() {
        let mut x = ArrayD::from_elem(IxDyn(&[1]), 5.0);
        let mut adam = Adam::new(0.1);
        for _ in 0..1000 {
            let grad = x.mapv(|v| 2.0 * (v - 3.0));
            adam.step(vec![x.view_mut()], &[grad]);
        }
        assert!((x.as_slice().unwrap()[0] - 3.0).abs() < 5e-2);
    }
}
