//! Adam optimizer state for a stack of dense layers.

use ndarray::{Array, Array1, Array2, Dimension, Zip};

/// First and second moment estimates for one layer's parameters.
#[derive(Debug, Clone)]
struct LayerMoments {
    m_weights: Array2<f32>,
    v_weights: Array2<f32>,
    m_bias: Array1<f32>,
    v_bias: Array1<f32>,
}

/// Bias-corrected step parameters shared by every tensor in one update.
struct Step {
    beta1: f32,
    beta2: f32,
    eps: f32,
    lr_t: f32,
}

#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    eps: f32,
    t: i32,
    moments: Vec<LayerMoments>,
}

impl Adam {
    /// `shapes` holds the `(inputs, outputs)` of every layer in order.
    pub fn new(learning_rate: f32, shapes: &[(usize, usize)]) -> Self {
        let moments = shapes
            .iter()
            .map(|&(rows, cols)| LayerMoments {
                m_weights: Array2::zeros((rows, cols)),
                v_weights: Array2::zeros((rows, cols)),
                m_bias: Array1::zeros(cols),
                v_bias: Array1::zeros(cols),
            })
            .collect();

        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-7,
            t: 0,
            moments,
        }
    }

    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    pub fn steps(&self) -> i32 {
        self.t
    }

    /// Advance the step counter. Call once per batch, before the updates.
    pub fn begin_step(&mut self) {
        self.t = self.t.saturating_add(1);
    }

    /// Apply one update to layer `index`.
    pub fn update(
        &mut self,
        index: usize,
        weights: &mut Array2<f32>,
        bias: &mut Array1<f32>,
        grad_weights: &Array2<f32>,
        grad_bias: &Array1<f32>,
    ) {
        let step = Step {
            beta1: self.beta1,
            beta2: self.beta2,
            eps: self.eps,
            lr_t: self.learning_rate * (1.0 - self.beta2.powi(self.t)).sqrt()
                / (1.0 - self.beta1.powi(self.t)),
        };
        let moments = &mut self.moments[index];
        apply(
            weights,
            grad_weights,
            &mut moments.m_weights,
            &mut moments.v_weights,
            &step,
        );
        apply(bias, grad_bias, &mut moments.m_bias, &mut moments.v_bias, &step);
    }
}

fn apply<D: Dimension>(
    param: &mut Array<f32, D>,
    grad: &Array<f32, D>,
    m: &mut Array<f32, D>,
    v: &mut Array<f32, D>,
    step: &Step,
) {
    Zip::from(param)
        .and(grad)
        .and(m)
        .and(v)
        .for_each(|p, &g, m, v| {
            *m = step.beta1 * *m + (1.0 - step.beta1) * g;
            *v = step.beta2 * *v + (1.0 - step.beta2) * g * g;
            *p -= step.lr_t * *m / (v.sqrt() + step.eps);
        });
}
