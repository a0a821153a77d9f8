//! Feed-forward regression network on ndarray.

use super::optimizer::Adam;
use super::ModelError;
use crate::features::FEATURE_COUNT;
use crate::mood::JOINT_SPACE_SIZE;
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Tanh,
    Linear,
}

impl Activation {
    fn apply(self, z: &mut Array2<f32>) {
        if self == Activation::Tanh {
            z.mapv_inplace(f32::tanh);
        }
    }

    /// Derivative expressed through the activation's own output.
    fn derivative_from_output(self, a: &Array2<f32>) -> Array2<f32> {
        match self {
            Activation::Tanh => a.mapv(|y| 1.0 - y * y),
            Activation::Linear => Array2::ones(a.raw_dim()),
        }
    }
}

/// Layer widths of a network with one shared hidden activation and a
/// linear output layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Architecture {
    pub input_width: usize,
    pub hidden: Vec<usize>,
    pub output_width: usize,
    pub hidden_activation: Activation,
}

impl Architecture {
    /// Joint mood space in, twelve normalized audio features out.
    pub fn mood_regressor() -> Self {
        Self {
            input_width: JOINT_SPACE_SIZE,
            hidden: vec![128, 64, 32],
            output_width: FEATURE_COUNT,
            hidden_activation: Activation::Tanh,
        }
    }

    /// `(inputs, outputs)` of every layer in order.
    pub fn layer_shapes(&self) -> Vec<(usize, usize)> {
        let mut widths = Vec::with_capacity(self.hidden.len() + 2);
        widths.push(self.input_width);
        widths.extend(&self.hidden);
        widths.push(self.output_width);
        widths.windows(2).map(|w| (w[0], w[1])).collect()
    }

    fn activation_of(&self, layer: usize) -> Activation {
        if layer == self.hidden.len() {
            Activation::Linear
        } else {
            self.hidden_activation
        }
    }
}

impl Default for Architecture {
    fn default() -> Self {
        Self::mood_regressor()
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.input_width)?;
        for width in &self.hidden {
            write!(f, "-{}", width)?;
        }
        write!(f, "-{} ({:?} hidden)", self.output_width, self.hidden_activation)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseLayer {
    pub weights: Array2<f32>,
    pub bias: Array1<f32>,
    pub activation: Activation,
}

impl DenseLayer {
    /// Glorot-uniform weights, zero bias.
    fn glorot<R: Rng>(
        inputs: usize,
        outputs: usize,
        activation: Activation,
        rng: &mut R,
    ) -> Self {
        let limit = (6.0 / (inputs + outputs) as f32).sqrt();
        Self {
            weights: Array2::from_shape_fn((inputs, outputs), |_| rng.random_range(-limit..limit)),
            bias: Array1::zeros(outputs),
            activation,
        }
    }

    fn forward(&self, input: &Array2<f32>) -> Array2<f32> {
        let mut z = input.dot(&self.weights) + &self.bias;
        self.activation.apply(&mut z);
        z
    }
}

/// Persisted form of a model: architecture plus per-layer parameters.
/// Optimizer state is not part of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelWeights {
    pub architecture: Architecture,
    pub layers: Vec<DenseLayer>,
}

/// Loss and optimizer configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompileOptions {
    pub learning_rate: f32,
    pub huber_delta: f32,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            learning_rate: 0.01,
            huber_delta: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitOptions {
    pub epochs: usize,
    pub batch_size: usize,
    /// Fraction of rows held out for validation, in `[0, 1)`.
    pub validation_split: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            epochs: 10,
            batch_size: 32,
            validation_split: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// 1-based.
    pub epoch: usize,
    pub loss: f64,
    pub mae: f64,
    pub val_loss: Option<f64>,
    pub val_mae: Option<f64>,
}

pub struct RegressionModel {
    architecture: Architecture,
    layers: Vec<DenseLayer>,
    compiled: Option<(CompileOptions, Adam)>,
}

impl RegressionModel {
    /// Fresh, uncompiled model with random weights.
    pub fn build<R: Rng>(architecture: Architecture, rng: &mut R) -> Self {
        let layers = architecture
            .layer_shapes()
            .into_iter()
            .enumerate()
            .map(|(i, (inputs, outputs))| {
                DenseLayer::glorot(inputs, outputs, architecture.activation_of(i), rng)
            })
            .collect();

        Self {
            architecture,
            layers,
            compiled: None,
        }
    }

    /// Rebuild an uncompiled model from persisted weights.
    pub fn from_weights(weights: ModelWeights) -> Result<Self, ModelError> {
        let shapes = weights.architecture.layer_shapes();
        if shapes.len() != weights.layers.len() {
            return Err(ModelError::Corrupted(format!(
                "architecture has {} layers, weights have {}",
                shapes.len(),
                weights.layers.len()
            )));
        }
        for (i, (layer, &(inputs, outputs))) in weights.layers.iter().zip(&shapes).enumerate() {
            if layer.weights.dim() != (inputs, outputs) || layer.bias.len() != outputs {
                return Err(ModelError::Corrupted(format!(
                    "layer {} has shape {:?}/{}, expected ({}, {})/{}",
                    i,
                    layer.weights.dim(),
                    layer.bias.len(),
                    inputs,
                    outputs,
                    outputs
                )));
            }
            if layer.activation != weights.architecture.activation_of(i) {
                return Err(ModelError::Corrupted(format!(
                    "layer {} has activation {:?}",
                    i, layer.activation
                )));
            }
            let finite = layer.weights.iter().chain(layer.bias.iter()).all(|v| v.is_finite());
            if !finite {
                return Err(ModelError::Corrupted(format!("layer {} has non-finite values", i)));
            }
        }

        Ok(Self {
            architecture: weights.architecture,
            layers: weights.layers,
            compiled: None,
        })
    }

    pub fn to_weights(&self) -> ModelWeights {
        ModelWeights {
            architecture: self.architecture.clone(),
            layers: self.layers.clone(),
        }
    }

    pub fn architecture(&self) -> &Architecture {
        &self.architecture
    }

    /// Attach loss and a fresh optimizer. Any previous optimizer state is dropped.
    pub fn compile(&mut self, options: CompileOptions) {
        let adam = Adam::new(options.learning_rate, &self.architecture.layer_shapes());
        self.compiled = Some((options, adam));
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled.is_some()
    }

    pub fn parameter_count(&self) -> usize {
        self.layers
            .iter()
            .map(|l| l.weights.len() + l.bias.len())
            .sum()
    }

    fn check_input_width(&self, found: usize) -> Result<(), ModelError> {
        if found != self.architecture.input_width {
            return Err(ModelError::InputWidth {
                expected: self.architecture.input_width,
                found,
            });
        }
        Ok(())
    }

    fn forward_all(&self, input: &Array2<f32>) -> Vec<Array2<f32>> {
        let mut activations = Vec::with_capacity(self.layers.len() + 1);
        activations.push(input.clone());
        for layer in &self.layers {
            let next = layer.forward(&activations[activations.len() - 1]);
            activations.push(next);
        }
        activations
    }

    pub fn predict_batch(&self, inputs: &Array2<f32>) -> Result<Array2<f32>, ModelError> {
        self.check_input_width(inputs.ncols())?;
        let mut activation = inputs.clone();
        for layer in &self.layers {
            activation = layer.forward(&activation);
        }
        Ok(activation)
    }

    pub fn predict(&self, input: &Array1<f32>) -> Result<Array1<f32>, ModelError> {
        let batch = input.clone().insert_axis(Axis(0));
        let out = self.predict_batch(&batch)?;
        Ok(out.row(0).to_owned())
    }

    /// Train on `inputs`/`targets` row pairs.
    ///
    /// Rows are shuffled once with `rng` and the tail `validation_split`
    /// fraction is held out; the remaining rows are reshuffled every epoch.
    /// `on_epoch` runs after each epoch with that epoch's metrics.
    pub fn fit<R, F>(
        &mut self,
        inputs: &Array2<f32>,
        targets: &Array2<f32>,
        options: &FitOptions,
        rng: &mut R,
        mut on_epoch: F,
    ) -> Result<Vec<EpochMetrics>, ModelError>
    where
        R: Rng,
        F: FnMut(&EpochMetrics),
    {
        self.check_input_width(inputs.ncols())?;
        if targets.ncols() != self.architecture.output_width || targets.nrows() != inputs.nrows()
        {
            return Err(ModelError::ShapeMismatch {
                inputs: inputs.nrows(),
                targets: targets.nrows(),
            });
        }
        if inputs.nrows() == 0 {
            return Err(ModelError::EmptyTrainingSet);
        }
        let mut optimizer = self.compiled.take().ok_or(ModelError::NotCompiled)?;
        let delta = optimizer.0.huber_delta;

        let mut order: Vec<usize> = (0..inputs.nrows()).collect();
        order.shuffle(rng);
        let val_count = ((inputs.nrows() as f64) * options.validation_split.clamp(0.0, 1.0)) as usize;
        let val_count = val_count.min(inputs.nrows() - 1);
        let mut train_idx: Vec<usize> = order[..order.len() - val_count].to_vec();
        let val_idx = &order[order.len() - val_count..];
        let validation = (!val_idx.is_empty()).then(|| {
            (
                inputs.select(Axis(0), val_idx),
                targets.select(Axis(0), val_idx),
            )
        });

        let batch_size = options.batch_size.max(1);
        let mut history = Vec::with_capacity(options.epochs);
        let mut outcome = Ok(());

        for epoch in 1..=options.epochs {
            train_idx.shuffle(rng);
            let mut loss_sum = 0.0;
            let mut mae_sum = 0.0;

            for batch in train_idx.chunks(batch_size) {
                let x = inputs.select(Axis(0), batch);
                let y = targets.select(Axis(0), batch);
                let (loss, mae) = self.train_batch(&x, &y, delta, &mut optimizer.1);
                loss_sum += loss * batch.len() as f64;
                mae_sum += mae * batch.len() as f64;
            }

            let seen = train_idx.len() as f64;
            let (val_loss, val_mae) = match &validation {
                Some((vx, vy)) => {
                    let (l, m) = self.evaluate_rows(vx, vy, delta);
                    (Some(l), Some(m))
                }
                None => (None, None),
            };
            let metrics = EpochMetrics {
                epoch,
                loss: loss_sum / seen,
                mae: mae_sum / seen,
                val_loss,
                val_mae,
            };
            if !metrics.loss.is_finite() {
                outcome = Err(ModelError::Diverged { epoch });
                break;
            }
            on_epoch(&metrics);
            history.push(metrics);
        }

        self.compiled = Some(optimizer);
        outcome.map(|_| history)
    }

    /// Huber loss and MAE of the model over the given rows.
    pub fn evaluate(
        &self,
        inputs: &Array2<f32>,
        targets: &Array2<f32>,
    ) -> Result<(f64, f64), ModelError> {
        self.check_input_width(inputs.ncols())?;
        if targets.dim() != (inputs.nrows(), self.architecture.output_width) {
            return Err(ModelError::ShapeMismatch {
                inputs: inputs.nrows(),
                targets: targets.nrows(),
            });
        }
        let delta = self
            .compiled
            .as_ref()
            .map(|(o, _)| o.huber_delta)
            .unwrap_or(CompileOptions::default().huber_delta);
        Ok(self.evaluate_rows(inputs, targets, delta))
    }

    fn evaluate_rows(&self, inputs: &Array2<f32>, targets: &Array2<f32>, delta: f32) -> (f64, f64) {
        let mut out = inputs.clone();
        for layer in &self.layers {
            out = layer.forward(&out);
        }
        let error = out - targets;
        (huber(&error, delta), mean_abs(&error))
    }

    fn train_batch(
        &mut self,
        x: &Array2<f32>,
        y: &Array2<f32>,
        delta: f32,
        optimizer: &mut Adam,
    ) -> (f64, f64) {
        let activations = self.forward_all(x);
        let error = &activations[activations.len() - 1] - y;
        let loss = huber(&error, delta);
        let mae = mean_abs(&error);

        // d(mean huber)/d(prediction)
        let n = error.len() as f32;
        let mut grad = error.mapv(|e| e.clamp(-delta, delta) / n);

        let mut grads = Vec::with_capacity(self.layers.len());
        for (i, layer) in self.layers.iter().enumerate().rev() {
            let dz = grad * layer.activation.derivative_from_output(&activations[i + 1]);
            let grad_weights = activations[i].t().dot(&dz);
            let grad_bias = dz.sum_axis(Axis(0));
            grad = dz.dot(&layer.weights.t());
            grads.push((i, grad_weights, grad_bias));
        }

        optimizer.begin_step();
        for (i, grad_weights, grad_bias) in grads {
            let layer = &mut self.layers[i];
            optimizer.update(i, &mut layer.weights, &mut layer.bias, &grad_weights, &grad_bias);
        }

        (loss, mae)
    }
}

fn huber(error: &Array2<f32>, delta: f32) -> f64 {
    if error.is_empty() {
        return 0.0;
    }
    let delta = delta as f64;
    let total: f64 = error
        .iter()
        .map(|&e| {
            let a = (e as f64).abs();
            if a <= delta {
                0.5 * a * a
            } else {
                delta * (a - 0.5 * delta)
            }
        })
        .sum();
    total / error.len() as f64
}

fn mean_abs(error: &Array2<f32>) -> f64 {
    if error.is_empty() {
        return 0.0;
    }
    error.iter().map(|&e| (e as f64).abs()).sum::<f64>() / error.len() as f64
}
