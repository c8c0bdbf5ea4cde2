//! A single fully-connected unit.
//!
//! All mutable state lives in [`SharedF64`] cells so a [`Network`](crate::Network)
//! can be trained through a shared reference from several threads at once.
use crate::shared::{SharedF64, cells, snapshot};
use rand::Rng;

/// Weight initialization scheme for a neuron.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Initialization {
    /// He initialization, `sqrt(2 / inputs)`, suited to the ReLU family.
    He,
    /// Small uniform weights with a fixed factor of `0.1`.
    Small,
}

impl Initialization {
    /// The bound on the initial weight magnitude for `input_width` inputs.
    #[must_use]
    pub fn factor(self, input_width: usize, weight_scale: f64) -> f64 {
        match self {
            Initialization::He => (2.0 / input_width as f64).sqrt() * weight_scale,
            Initialization::Small => 0.1 * weight_scale,
        }
    }
}

#[derive(Debug)]
pub struct Neuron {
    weights: Box<[SharedF64]>,
    /// Last update applied to each weight, carried into the next one as momentum
    previous_updates: Box<[SharedF64]>,
    bias: SharedF64,
    /// Raw weighted sum from the most recent forward pass
    output: SharedF64,
    /// Backpropagated error term from the most recent backward pass
    delta: SharedF64,
}

impl Neuron {
    /// Creates a neuron with random weights drawn from `U(-1, 1) * factor`.
    ///
    /// The bias is drawn from the same distribution scaled by a further `0.1`.
    pub fn new<R: Rng + ?Sized>(
        input_width: usize,
        initialization: Initialization,
        weight_scale: f64,
        rng: &mut R,
    ) -> Self {
        let factor = initialization.factor(input_width, weight_scale);
        let weights: Vec<f64> = (0..input_width)
            .map(|_| rng.random_range(-1.0..1.0) * factor)
            .collect();
        let bias = rng.random_range(-1.0..1.0) * factor * 0.1;
        Self::from_weights(weights, bias)
    }

    /// Creates a neuron with exact weights and bias.
    #[must_use]
    pub fn from_weights(weights: Vec<f64>, bias: f64) -> Self {
        let width = weights.len();
        Self {
            weights: cells(weights),
            previous_updates: cells(std::iter::repeat_n(0.0, width)),
            bias: SharedF64::new(bias),
            output: SharedF64::default(),
            delta: SharedF64::default(),
        }
    }

    /// Computes `bias + Σ weight[i] * input[i]` and caches it as the raw output.
    ///
    /// The caller guarantees that `inputs` has the neuron's input width.
    pub fn activate(&self, inputs: &[f64]) -> f64 {
        let sum = self
            .weights
            .iter()
            .zip(inputs)
            .fold(self.bias.load(), |sum, (weight, input)| {
                sum + input * weight.load()
            });
        self.output.store(sum);
        sum
    }

    /// Applies one momentum step using the current delta.
    ///
    /// `prev_outputs` are the activations that fed this neuron on the forward pass.
    pub fn update_weights(&self, prev_outputs: &[f64], learning_rate: f64, momentum: f64) {
        let delta = self.delta.load();
        for ((weight, previous), input) in self
            .weights
            .iter()
            .zip(self.previous_updates.iter())
            .zip(prev_outputs)
        {
            let update = -learning_rate * delta * input;
            weight.store(weight.load() + (update + momentum * previous.load()));
            previous.store(update);
        }
        self.bias.store(self.bias.load() - learning_rate * delta);
    }

    pub fn input_width(&self) -> usize {
        self.weights.len()
    }

    /// Weight connecting input `index` to this neuron, or `0.0` when out of range.
    pub fn weight(&self, index: usize) -> f64 {
        self.weights.get(index).map_or(0.0, SharedF64::load)
    }

    pub fn weights(&self) -> Vec<f64> {
        snapshot(&self.weights)
    }

    pub fn previous_updates(&self) -> Vec<f64> {
        snapshot(&self.previous_updates)
    }

    pub fn bias(&self) -> f64 {
        self.bias.load()
    }

    pub fn output(&self) -> f64 {
        self.output.load()
    }

    pub fn delta(&self) -> f64 {
        self.delta.load()
    }

    pub(crate) fn set_delta(&self, delta: f64) {
        self.delta.store(delta);
    }
}
