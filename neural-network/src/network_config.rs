use crate::error::NetworkError;
use crate::network::validate_architecture;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// Configuration for a neural network.
///
/// This struct holds the layer layout and the gradient descent tunables needed to
/// build a [`Network`](crate::Network).
///
/// # Example
///
/// ```
/// use neural_network::NetworkConfig;
///
/// let config = NetworkConfig::default();
/// assert_eq!(config.to_string(), "15-10-5-1");
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NetworkConfig {
    /// Width of every input vector.
    pub input_nodes: usize,

    /// Sizes of the hidden layers, in order. Must not be empty.
    pub hidden_layers: Vec<usize>,

    /// Width of the output vector.
    pub output_nodes: usize,

    /// Step size for gradient descent.
    pub learning_rate: f64,

    /// Fraction of the previous weight update carried into the next one.
    pub momentum: f64,
}

impl NetworkConfig {
    pub fn new(
        input_nodes: usize,
        hidden_layers: Vec<usize>,
        output_nodes: usize,
        learning_rate: f64,
        momentum: f64,
    ) -> Self {
        Self {
            input_nodes,
            hidden_layers,
            output_nodes,
            learning_rate,
            momentum,
        }
    }

    /// Loads and validates a network configuration from a JSON file.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use neural_network::NetworkConfig;
    /// use std::path::Path;
    ///
    /// let config = NetworkConfig::load(Path::new("config.json")).unwrap();
    /// ```
    pub fn load(path: &Path) -> Result<Self, NetworkError> {
        let config_str = fs::read_to_string(path)?;
        let config: NetworkConfig = serde_json::from_str(&config_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the layer layout without building a network.
    pub fn validate(&self) -> Result<(), NetworkError> {
        validate_architecture(self.input_nodes, &self.hidden_layers, self.output_nodes)
    }
}

/// The reference experiment: 15 engineered features, two hidden layers and a
/// single survival output.
impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            input_nodes: 15,
            hidden_layers: vec![10, 5],
            output_nodes: 1,
            learning_rate: 0.007,
            momentum: 0.9,
        }
    }
}

impl fmt::Display for NetworkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.input_nodes)?;
        for nodes in &self.hidden_layers {
            write!(f, "-{nodes}")?;
        }
        write!(f, "-{}", self.output_nodes)
    }
}
