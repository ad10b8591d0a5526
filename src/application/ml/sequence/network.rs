//! Two stacked LSTM layers followed by two dense layers, predicting the next
//! scaled price from a window of scaled prices.
//!
//! Training is plain backpropagation through time over one window per update
//! (batch size 1) with MSE loss and Adam.

use super::optimizer::Adam;
use ndarray::{Array1, Array2, ArrayD, ArrayViewMutD, Axis, s};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Architecture of a [`SequenceNetwork`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkShape {
    /// Number of past prices fed to the network per prediction.
    pub window: usize,
    /// Units in each of the two LSTM layers.
    pub lstm_units: usize,
    /// Units in the hidden dense layer.
    pub dense_units: usize,
}

impl Default for NetworkShape {
    fn default() -> Self {
        Self {
            window: 60,
            lstm_units: 50,
            dense_units: 25,
        }
    }
}

/// Hyperparameters for [`SequenceNetwork::fit`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingParams {
    pub epochs: usize,
    pub learning_rate: f64,
    pub seed: u64,
    /// Leading share of the series used to build training windows.
    pub train_fraction: f64,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            epochs: 1,
            learning_rate: 0.001,
            seed: 42,
            train_fraction: 0.8,
        }
    }
}

/// One supervised example: `window` scaled prices and the price that followed.
#[derive(Debug, Clone, Copy)]
pub struct TrainingWindow<'a> {
    pub input: &'a [f64],
    pub target: f64,
}

/// Every `(values[i - window..i], values[i])` pair of the series.
pub fn supervised_windows(values: &[f64], window: usize) -> Vec<TrainingWindow<'_>> {
    if window == 0 {
        return Vec::new();
    }
    (window..values.len())
        .map(|i| TrainingWindow {
            input: &values[i - window..i],
            target: values[i],
        })
        .collect()
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn outer(a: &Array1<f64>, b: &Array1<f64>) -> Array2<f64> {
    a.view()
        .insert_axis(Axis(1))
        .dot(&b.view().insert_axis(Axis(0)))
}

fn glorot_uniform(rng: &mut StdRng, rows: usize, cols: usize) -> Array2<f64> {
    let limit = (6.0 / (rows + cols) as f64).sqrt();
    Array2::from_shape_fn((rows, cols), |_| rng.random_range(-limit..limit))
}

/// LSTM layer with gates stacked as `[input, forget, candidate, output]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LstmLayer {
    input_weights: Array2<f64>,
    recurrent_weights: Array2<f64>,
    bias: Array1<f64>,
}

/// Activations of one time step, kept for the backward pass.
struct LstmStep {
    x: Array1<f64>,
    h_prev: Array1<f64>,
    c_prev: Array1<f64>,
    i: Array1<f64>,
    f: Array1<f64>,
    g: Array1<f64>,
    o: Array1<f64>,
    c: Array1<f64>,
    h: Array1<f64>,
}

struct LstmGrads {
    input_weights: Array2<f64>,
    recurrent_weights: Array2<f64>,
    bias: Array1<f64>,
}

impl LstmLayer {
    fn new(input_size: usize, units: usize, rng: &mut StdRng) -> Self {
        let mut bias: Array1<f64> = Array1::zeros(4 * units);
        // Forget gate starts open.
        bias.slice_mut(s![units..2 * units]).fill(1.0);
        Self {
            input_weights: glorot_uniform(rng, 4 * units, input_size),
            recurrent_weights: glorot_uniform(rng, 4 * units, units),
            bias,
        }
    }

    fn units(&self) -> usize {
        self.bias.len() / 4
    }

    fn check(&self, input_size: usize, units: usize) -> Result<(), String> {
        let gates = 4 * units;
        if self.input_weights.dim() != (gates, input_size)
            || self.recurrent_weights.dim() != (gates, units)
            || self.bias.len() != gates
        {
            return Err(format!(
                "lstm layer weights do not match {} inputs x {} units",
                input_size, units
            ));
        }
        Ok(())
    }

    fn step(&self, x: Array1<f64>, h_prev: Array1<f64>, c_prev: Array1<f64>) -> LstmStep {
        let n = self.units();
        let z = self.input_weights.dot(&x) + self.recurrent_weights.dot(&h_prev) + &self.bias;

        let i = z.slice(s![0..n]).mapv(sigmoid);
        let f = z.slice(s![n..2 * n]).mapv(sigmoid);
        let g = z.slice(s![2 * n..3 * n]).mapv(f64::tanh);
        let o = z.slice(s![3 * n..4 * n]).mapv(sigmoid);

        let c = &f * &c_prev + &i * &g;
        let h = &o * &c.mapv(f64::tanh);

        LstmStep {
            x,
            h_prev,
            c_prev,
            i,
            f,
            g,
            o,
            c,
            h,
        }
    }

    fn forward(&self, inputs: Vec<Array1<f64>>) -> Vec<LstmStep> {
        let n = self.units();
        let mut h = Array1::zeros(n);
        let mut c = Array1::zeros(n);
        let mut steps = Vec::with_capacity(inputs.len());

        for x in inputs {
            let step = self.step(x, h, c);
            h = step.h.clone();
            c = step.c.clone();
            steps.push(step);
        }
        steps
    }

    /// Backpropagate `dh_out[t]` (loss gradient w.r.t. each emitted hidden
    /// state) through time. Returns parameter gradients and the gradient
    /// w.r.t. each step's input.
    fn backward(&self, steps: &[LstmStep], dh_out: &[Array1<f64>]) -> (LstmGrads, Vec<Array1<f64>>) {
        let n = self.units();
        let mut grads = LstmGrads {
            input_weights: Array2::zeros(self.input_weights.raw_dim()),
            recurrent_weights: Array2::zeros(self.recurrent_weights.raw_dim()),
            bias: Array1::zeros(self.bias.len()),
        };
        let mut dx: Vec<Array1<f64>> = vec![Array1::zeros(self.input_weights.ncols()); steps.len()];
        let mut dh_next: Array1<f64> = Array1::zeros(n);
        let mut dc_next: Array1<f64> = Array1::zeros(n);

        for t in (0..steps.len()).rev() {
            let st = &steps[t];
            let dh = &dh_out[t] + &dh_next;
            let tanh_c = st.c.mapv(f64::tanh);

            let d_o = &dh * &tanh_c;
            let dc = &dc_next + &(&dh * &st.o * &tanh_c.mapv(|v| 1.0 - v * v));
            let d_i = &dc * &st.g;
            let d_g = &dc * &st.i;
            let d_f = &dc * &st.c_prev;
            dc_next = &dc * &st.f;

            let mut dz: Array1<f64> = Array1::zeros(4 * n);
            dz.slice_mut(s![0..n])
                .assign(&(&d_i * &st.i.mapv(|v| v * (1.0 - v))));
            dz.slice_mut(s![n..2 * n])
                .assign(&(&d_f * &st.f.mapv(|v| v * (1.0 - v))));
            dz.slice_mut(s![2 * n..3 * n])
                .assign(&(&d_g * &st.g.mapv(|v| 1.0 - v * v)));
            dz.slice_mut(s![3 * n..4 * n])
                .assign(&(&d_o * &st.o.mapv(|v| v * (1.0 - v))));

            grads.input_weights += &outer(&dz, &st.x);
            grads.recurrent_weights += &outer(&dz, &st.h_prev);
            grads.bias += &dz;

            dx[t] = self.input_weights.t().dot(&dz);
            dh_next = self.recurrent_weights.t().dot(&dz);
        }

        (grads, dx)
    }
}

/// Fully connected layer with linear activation.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DenseLayer {
    weights: Array2<f64>,
    bias: Array1<f64>,
}

impl DenseLayer {
    fn new(input_size: usize, units: usize, rng: &mut StdRng) -> Self {
        Self {
            weights: glorot_uniform(rng, units, input_size),
            bias: Array1::zeros(units),
        }
    }

    fn check(&self, input_size: usize, units: usize) -> Result<(), String> {
        if self.weights.dim() != (units, input_size) || self.bias.len() != units {
            return Err(format!(
                "dense layer weights do not match {} inputs x {} units",
                input_size, units
            ));
        }
        Ok(())
    }

    fn forward(&self, x: &Array1<f64>) -> Array1<f64> {
        self.weights.dot(x) + &self.bias
    }

    fn backward(&self, x: &Array1<f64>, dy: &Array1<f64>) -> (Array2<f64>, Array1<f64>, Array1<f64>) {
        (outer(dy, x), dy.clone(), self.weights.t().dot(dy))
    }
}

struct ForwardPass {
    lower: Vec<LstmStep>,
    upper: Vec<LstmStep>,
    dense_in: Array1<f64>,
    dense_out: Array1<f64>,
    output: f64,
}

/// Trained sequence model. This is the persisted artifact of the sequence strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceNetwork {
    shape: NetworkShape,
    lower: LstmLayer,
    upper: LstmLayer,
    hidden: DenseLayer,
    output: DenseLayer,
}

impl SequenceNetwork {
    /// Freshly initialised, untrained network. Initialisation is
    /// deterministic for a given `seed`.
    pub fn new(shape: NetworkShape, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::with_rng(shape, &mut rng)
    }

    fn with_rng(shape: NetworkShape, rng: &mut StdRng) -> Self {
        Self {
            shape,
            lower: LstmLayer::new(1, shape.lstm_units, rng),
            upper: LstmLayer::new(shape.lstm_units, shape.lstm_units, rng),
            hidden: DenseLayer::new(shape.lstm_units, shape.dense_units, rng),
            output: DenseLayer::new(shape.dense_units, 1, rng),
        }
    }

    pub fn shape(&self) -> NetworkShape {
        self.shape
    }

    /// Checks that this network matches `expected` and that every weight
    /// matrix has the dimensions its shape implies.
    pub fn check_compatible(&self, expected: &NetworkShape) -> Result<(), String> {
        if self.shape != *expected {
            return Err(format!(
                "stored shape {:?} differs from configured {:?}",
                self.shape, expected
            ));
        }
        let units = self.shape.lstm_units;
        self.lower.check(1, units)?;
        self.upper.check(units, units)?;
        self.hidden.check(units, self.shape.dense_units)?;
        self.output.check(self.shape.dense_units, 1)
    }

    fn forward(&self, window: &[f64]) -> ForwardPass {
        let inputs: Vec<Array1<f64>> = window.iter().map(|&v| Array1::from_elem(1, v)).collect();
        let lower = self.lower.forward(inputs);
        let upper = self
            .upper
            .forward(lower.iter().map(|step| step.h.clone()).collect());

        let dense_in = upper
            .last()
            .map(|step| step.h.clone())
            .unwrap_or_else(|| Array1::zeros(self.shape.lstm_units));
        let dense_out = self.hidden.forward(&dense_in);
        let output = self.output.forward(&dense_out)[0];

        ForwardPass {
            lower,
            upper,
            dense_in,
            dense_out,
            output,
        }
    }

    /// Predict the scaled price that follows `window`.
    pub fn predict(&self, window: &[f64]) -> f64 {
        self.forward(window).output
    }

    /// Squared error on one window and the gradient of every parameter, in
    /// the order of [`SequenceNetwork::parameters_mut`].
    fn gradients(&self, sample: &TrainingWindow<'_>) -> (f64, Vec<ArrayD<f64>>) {
        let pass = self.forward(sample.input);
        let error = pass.output - sample.target;
        let d_out = Array1::from_elem(1, 2.0 * error);

        let (dw_output, db_output, d_dense_out) = self.output.backward(&pass.dense_out, &d_out);
        let (dw_hidden, db_hidden, d_last_hidden) =
            self.hidden.backward(&pass.dense_in, &d_dense_out);

        // Only the final upper-layer hidden state feeds the dense head.
        let steps = pass.upper.len();
        let mut dh_upper: Vec<Array1<f64>> = vec![Array1::zeros(self.shape.lstm_units); steps];
        if let Some(last) = dh_upper.last_mut() {
            *last = d_last_hidden;
        }
        let (upper_grads, dh_lower) = self.upper.backward(&pass.upper, &dh_upper);
        let (lower_grads, _) = self.lower.backward(&pass.lower, &dh_lower);

        let grads = vec![
            lower_grads.input_weights.into_dyn(),
            lower_grads.recurrent_weights.into_dyn(),
            lower_grads.bias.into_dyn(),
            upper_grads.input_weights.into_dyn(),
            upper_grads.recurrent_weights.into_dyn(),
            upper_grads.bias.into_dyn(),
            dw_hidden.into_dyn(),
            db_hidden.into_dyn(),
            dw_output.into_dyn(),
            db_output.into_dyn(),
        ];
        (error * error, grads)
    }

    fn parameters_mut(&mut self) -> Vec<ArrayViewMutD<'_, f64>> {
        vec![
            self.lower.input_weights.view_mut().into_dyn(),
            self.lower.recurrent_weights.view_mut().into_dyn(),
            self.lower.bias.view_mut().into_dyn(),
            self.upper.input_weights.view_mut().into_dyn(),
            self.upper.recurrent_weights.view_mut().into_dyn(),
            self.upper.bias.view_mut().into_dyn(),
            self.hidden.weights.view_mut().into_dyn(),
            self.hidden.bias.view_mut().into_dyn(),
            self.output.weights.view_mut().into_dyn(),
            self.output.bias.view_mut().into_dyn(),
        ]
    }

    /// Train on `samples`, shuffled each epoch with a generator seeded from
    /// `params.seed`. Returns the mean squared error of the last epoch.
    pub fn fit(&mut self, samples: &[TrainingWindow<'_>], params: &TrainingParams) -> f64 {
        let mut rng = StdRng::seed_from_u64(params.seed.wrapping_add(1));
        let mut optimizer = Adam::new(params.learning_rate);
        let mut order: Vec<usize> = (0..samples.len()).collect();
        let mut last_epoch_loss = 0.0;

        for _ in 0..params.epochs {
            order.shuffle(&mut rng);
            let mut epoch_loss = 0.0;

            for &idx in &order {
                let (loss, grads) = self.gradients(&samples[idx]);
                epoch_loss += loss;
                optimizer.step(self.parameters_mut(), &grads);
            }

            if !samples.is_empty() {
                last_epoch_loss = epoch_loss / samples.len() as f64;
            }
        }

        last_epoch_loss
    }
}
