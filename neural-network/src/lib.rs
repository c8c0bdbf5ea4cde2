// Modules
pub mod activations;
pub mod error;
pub mod layer;
pub mod network;
pub mod network_config;
pub mod neuron;
pub mod sample;
pub mod shared;

pub use activations::{
    ActivationType, LEAKY_RELU_ALPHA, SIGMOID_SATURATION, leaky_relu, leaky_relu_derivative,
    sigmoid, sigmoid_derivative,
};
pub use error::NetworkError;
pub use layer::{Layer, LayerRole};
pub use network::{DECISION_THRESHOLD, DEFAULT_LEARNING_RATE, DEFAULT_MOMENTUM, Network};
pub use network_config::NetworkConfig;
pub use neuron::{Initialization, Neuron};
pub use sample::{ExecutionMode, Sample};
pub use shared::SharedF64;
