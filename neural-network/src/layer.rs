//! Defines the structure of a layer within the neural network.
//!
//! A layer is a fixed set of neurons that all read the same input vector. Its
//! role decides which activation function turns raw sums into visible outputs.
use crate::activations::ActivationType;
use crate::neuron::{Initialization, Neuron};
use crate::shared::{SharedF64, cells, snapshot};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a layer in the network.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayerRole {
    Hidden,
    Output,
}

impl LayerRole {
    /// Hidden layers use leaky ReLU, the output layer uses sigmoid.
    #[must_use]
    pub fn activation(self) -> ActivationType {
        match self {
            LayerRole::Hidden => ActivationType::LeakyRelu,
            LayerRole::Output => ActivationType::Sigmoid,
        }
    }
}

#[derive(Debug)]
pub struct Layer {
    neurons: Vec<Neuron>,
    /// Post-activation outputs from the most recent forward pass
    outputs: Box<[SharedF64]>,
    role: LayerRole,
}

impl Layer {
    /// Creates a layer of `nodes` randomly initialized neurons reading `input_width` values.
    pub fn new<R: Rng + ?Sized>(
        input_width: usize,
        nodes: usize,
        role: LayerRole,
        initialization: Initialization,
        weight_scale: f64,
        rng: &mut R,
    ) -> Self {
        let neurons = (0..nodes)
            .map(|_| Neuron::new(input_width, initialization, weight_scale, rng))
            .collect();
        Self::from_neurons(neurons, role)
    }

    /// A hidden layer with He-initialized weights.
    pub fn hidden<R: Rng + ?Sized>(input_width: usize, nodes: usize, rng: &mut R) -> Self {
        Self::new(input_width, nodes, LayerRole::Hidden, Initialization::He, 1.0, rng)
    }

    /// An output layer with small weights at half scale.
    pub fn output<R: Rng + ?Sized>(input_width: usize, nodes: usize, rng: &mut R) -> Self {
        Self::new(input_width, nodes, LayerRole::Output, Initialization::Small, 0.5, rng)
    }

    #[must_use]
    pub fn from_neurons(neurons: Vec<Neuron>, role: LayerRole) -> Self {
        let outputs = cells(std::iter::repeat_n(0.0, neurons.len()));
        Self {
            neurons,
            outputs,
            role,
        }
    }

    /// Runs every neuron on `inputs`, applies the role's activation and caches the result.
    pub fn activate(&self, inputs: &[f64]) -> Vec<f64> {
        let activation = self.role.activation();
        self.neurons
            .iter()
            .zip(self.outputs.iter())
            .map(|(neuron, cached)| {
                let value = activation.apply(neuron.activate(inputs));
                cached.store(value);
                value
            })
            .collect()
    }

    /// Applies a momentum step to every neuron, given the inputs this layer last saw.
    pub fn update_weights(&self, prev_outputs: &[f64], learning_rate: f64, momentum: f64) {
        for neuron in &self.neurons {
            neuron.update_weights(prev_outputs, learning_rate, momentum);
        }
    }

    pub fn neurons(&self) -> &[Neuron] {
        &self.neurons
    }

    pub fn outputs(&self) -> Vec<f64> {
        snapshot(&self.outputs)
    }

    pub fn role(&self) -> LayerRole {
        self.role
    }

    /// Number of neurons, which is also the width of the output vector.
    pub fn width(&self) -> usize {
        self.neurons.len()
    }

    /// Width of the input vector, or `None` for a layer without neurons.
    pub fn input_width(&self) -> Option<usize> {
        self.neurons.first().map(Neuron::input_width)
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{{ nodes: {}, activation: {:?} }}",
            self.width(),
            self.role.activation()
        )
    }
}
