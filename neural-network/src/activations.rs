//! Activation functions and their derivatives.
//!
//! Hidden layers use leaky ReLU and the output layer uses a saturating sigmoid.
//! Derivatives are evaluated on the raw (pre-activation) value cached by each neuron.
use serde::{Deserialize, Serialize};

/// Slope applied to non-positive inputs by [`leaky_relu`].
pub const LEAKY_RELU_ALPHA: f64 = 0.01;

/// Beyond this magnitude [`sigmoid`] returns exactly `0.0` or `1.0`.
pub const SIGMOID_SATURATION: f64 = 45.0;

/// Returns `x` for positive inputs and `alpha * x` otherwise.
#[inline]
#[must_use]
pub fn leaky_relu(x: f64, alpha: f64) -> f64 {
    if x > 0.0 { x } else { alpha * x }
}

/// Returns `1.0` for positive inputs and `alpha` otherwise.
#[inline]
#[must_use]
pub fn leaky_relu_derivative(x: f64, alpha: f64) -> f64 {
    if x > 0.0 { 1.0 } else { alpha }
}

/// Logistic function, clamped to exactly `0.0` below `-45` and `1.0` above `45`.
#[inline]
#[must_use]
pub fn sigmoid(x: f64) -> f64 {
    if x < -SIGMOID_SATURATION {
        return 0.0;
    }
    if x > SIGMOID_SATURATION {
        return 1.0;
    }
    1.0 / (1.0 + (-x).exp())
}

#[inline]
#[must_use]
pub fn sigmoid_derivative(x: f64) -> f64 {
    let s = sigmoid(x);
    s * (1.0 - s)
}

/// The activation functions available to a layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivationType {
    LeakyRelu,
    Sigmoid,
}

impl ActivationType {
    /// Applies the activation to a raw neuron output.
    #[must_use]
    pub fn apply(self, x: f64) -> f64 {
        match self {
            ActivationType::LeakyRelu => leaky_relu(x, LEAKY_RELU_ALPHA),
            ActivationType::Sigmoid => sigmoid(x),
        }
    }

    /// Derivative of the activation, evaluated at the raw neuron output.
    #[must_use]
    pub fn derivative(self, x: f64) -> f64 {
        match self {
            ActivationType::LeakyRelu => leaky_relu_derivative(x, LEAKY_RELU_ALPHA),
            ActivationType::Sigmoid => sigmoid_derivative(x),
        }
    }
}
