use crate::activations::sigmoid_derivative;
use crate::error::NetworkError;
use crate::layer::{Layer, LayerRole};
use crate::network_config::NetworkConfig;
use crate::sample::{ExecutionMode, Sample};
use parking_lot::Mutex;
use rand::Rng;
use rayon::prelude::*;
use std::fmt;

pub const DEFAULT_LEARNING_RATE: f64 = 0.01;
pub const DEFAULT_MOMENTUM: f64 = 0.9;

/// Outputs above this value are read as the positive class.
pub const DECISION_THRESHOLD: f64 = 0.5;

type Result<T> = std::result::Result<T, NetworkError>;

/// A fully-connected feedforward network trained by per-example gradient descent
/// with classical momentum.
///
/// Every hidden layer uses leaky ReLU and the final layer uses sigmoid. All weights
/// and per-pass caches are stored in shared cells, so forward and backward passes
/// take `&self` and the network can be trained from several threads at once. In
/// [`ExecutionMode::Parallel`] those threads update the same weights without any
/// synchronization: updates can be lost and scratch values can mix between
/// examples, so parallel results are not reproducible between runs.
///
/// # Examples
///
/// ```
/// use neural_network::{ExecutionMode, Network, Sample};
///
/// let mut network = Network::new(2, &[10], 1).unwrap();
/// network.set_learning_rate(0.1);
///
/// let samples = vec![
///     Sample::new(vec![0.0, 0.0], vec![0.0]),
///     Sample::new(vec![0.0, 1.0], vec![0.0]),
///     Sample::new(vec![1.0, 0.0], vec![0.0]),
///     Sample::new(vec![1.0, 1.0], vec![1.0]),
/// ];
/// for _ in 0..100 {
///     network.train_epoch(&samples, ExecutionMode::Sequential).unwrap();
/// }
/// let accuracy = network.test(&samples).unwrap();
/// assert!((0.0..=1.0).contains(&accuracy));
/// ```
#[derive(Debug)]
pub struct Network {
    /// Width of the feature vector fed to the first layer
    input_width: usize,
    /// Hidden layers followed by the output layer
    layers: Vec<Layer>,
    learning_rate: f64,
    momentum: f64,
}

impl Network {
    /// Creates a randomly initialized network using the process-wide generator.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::InvalidArchitecture`] if `hidden_layers` is empty or
    /// any width is zero.
    pub fn new(input_width: usize, hidden_layers: &[usize], output_width: usize) -> Result<Self> {
        Self::with_rng(input_width, hidden_layers, output_width, &mut rand::rng())
    }

    /// Creates a network whose initial weights are drawn from `rng`.
    ///
    /// Hidden layers are He-initialized; the output layer uses small weights at
    /// half scale.
    pub fn with_rng<R: Rng + ?Sized>(
        input_width: usize,
        hidden_layers: &[usize],
        output_width: usize,
        rng: &mut R,
    ) -> Result<Self> {
        validate_architecture(input_width, hidden_layers, output_width)?;

        let mut layers = Vec::with_capacity(hidden_layers.len() + 1);
        let mut prev_width = input_width;
        for &nodes in hidden_layers {
            layers.push(Layer::hidden(prev_width, nodes, rng));
            prev_width = nodes;
        }
        layers.push(Layer::output(prev_width, output_width, rng));

        Ok(Self {
            input_width,
            layers,
            learning_rate: DEFAULT_LEARNING_RATE,
            momentum: DEFAULT_MOMENTUM,
        })
    }

    /// Creates a network from a configuration, including its learning rate and momentum.
    pub fn from_config(config: &NetworkConfig) -> Result<Self> {
        Self::from_config_with_rng(config, &mut rand::rng())
    }

    pub fn from_config_with_rng<R: Rng + ?Sized>(
        config: &NetworkConfig,
        rng: &mut R,
    ) -> Result<Self> {
        let mut network = Self::with_rng(
            config.input_nodes,
            &config.hidden_layers,
            config.output_nodes,
            rng,
        )?;
        network.learning_rate = config.learning_rate;
        network.momentum = config.momentum;
        Ok(network)
    }

    /// Assembles a network from prebuilt layers.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::InvalidArchitecture`] unless the layers are one or more
    /// hidden layers followed by exactly one output layer, none of them empty, and
    /// each layer reads the width the previous one produces.
    pub fn from_layers(input_width: usize, layers: Vec<Layer>) -> Result<Self> {
        let Some((output, hidden)) = layers.split_last() else {
            return Err(NetworkError::InvalidArchitecture(
                "a network needs at least one layer".to_string(),
            ));
        };
        if hidden.is_empty() {
            return Err(NetworkError::InvalidArchitecture(
                "at least one hidden layer is required".to_string(),
            ));
        }
        if output.role() != LayerRole::Output
            || hidden.iter().any(|layer| layer.role() != LayerRole::Hidden)
        {
            return Err(NetworkError::InvalidArchitecture(
                "only the last layer may be an output layer".to_string(),
            ));
        }

        let mut prev_width = input_width;
        for (position, layer) in layers.iter().enumerate() {
            if layer.width() == 0 {
                return Err(NetworkError::InvalidArchitecture(format!(
                    "layer {position} has no neurons"
                )));
            }
            if layer
                .neurons()
                .iter()
                .any(|neuron| neuron.input_width() != prev_width)
            {
                return Err(NetworkError::InvalidArchitecture(format!(
                    "layer {position} does not read {prev_width} inputs"
                )));
            }
            prev_width = layer.width();
        }

        Ok(Self {
            input_width,
            layers,
            learning_rate: DEFAULT_LEARNING_RATE,
            momentum: DEFAULT_MOMENTUM,
        })
    }

    /// Propagates `inputs` through every layer and returns the output layer's activations.
    ///
    /// Each neuron caches its raw sum and each layer its activations, which the
    /// following [`back_propagate`](Self::back_propagate) call reads.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::InvalidInput`] for an empty input vector and
    /// [`NetworkError::DataShapeMismatch`] when its width differs from the network's.
    pub fn feed_forward(&self, inputs: &[f64]) -> Result<Vec<f64>> {
        if inputs.is_empty() {
            return Err(NetworkError::InvalidInput(
                "input vector is empty".to_string(),
            ));
        }
        if inputs.len() != self.input_width {
            return Err(NetworkError::shape("inputs", self.input_width, inputs.len()));
        }

        let mut current = inputs.to_vec();
        for layer in &self.layers {
            current = layer.activate(&current);
        }
        Ok(current)
    }

    /// Backpropagates the error of the last forward pass and applies the weight update.
    ///
    /// `outputs` must come from [`feed_forward`](Self::feed_forward) on `inputs`.
    /// The update uses a squared-error gradient and is applied immediately.
    pub fn back_propagate(&self, outputs: &[f64], targets: &[f64], inputs: &[f64]) -> Result<()> {
        let output_width = self.output_width();
        if outputs.len() != output_width {
            return Err(NetworkError::shape("outputs", output_width, outputs.len()));
        }
        if targets.len() != output_width {
            return Err(NetworkError::shape("targets", output_width, targets.len()));
        }
        if inputs.len() != self.input_width {
            return Err(NetworkError::shape("inputs", self.input_width, inputs.len()));
        }

        self.calculate_output_layer_deltas(outputs, targets);
        self.calculate_hidden_layer_deltas();
        self.update_weights(inputs);
        Ok(())
    }

    fn calculate_output_layer_deltas(&self, outputs: &[f64], targets: &[f64]) {
        let Some(output_layer) = self.layers.last() else {
            return;
        };
        for ((neuron, output), target) in output_layer.neurons().iter().zip(outputs).zip(targets) {
            neuron.set_delta((output - target) * sigmoid_derivative(neuron.output()));
        }
    }

    /// Walks from the last hidden layer back to the first, using the next layer's
    /// deltas and the weights that connect back to each neuron.
    fn calculate_hidden_layer_deltas(&self) {
        for pair in self.layers.windows(2).rev() {
            let [layer, next] = pair else {
                continue;
            };
            let activation = layer.role().activation();
            for (index, neuron) in layer.neurons().iter().enumerate() {
                let error: f64 = next
                    .neurons()
                    .iter()
                    .map(|downstream| downstream.delta() * downstream.weight(index))
                    .sum();
                neuron.set_delta(error * activation.derivative(neuron.output()));
            }
        }
    }

    fn update_weights(&self, inputs: &[f64]) {
        let mut prev_outputs = inputs.to_vec();
        for layer in &self.layers {
            layer.update_weights(&prev_outputs, self.learning_rate, self.momentum);
            prev_outputs = layer.outputs();
        }
    }

    /// One forward pass followed by one backward pass for a single example.
    pub fn train_sample(&self, sample: &Sample) -> Result<()> {
        let outputs = self.feed_forward(&sample.inputs)?;
        self.back_propagate(&outputs, &sample.targets, &sample.inputs)
    }

    /// Runs exactly one pass over `samples`.
    ///
    /// [`ExecutionMode::Sequential`] visits the samples in order and is fully
    /// deterministic. [`ExecutionMode::Parallel`] spreads them over the rayon pool with
    /// racing, unsynchronized updates. [`ExecutionMode::Synchronized`] uses the pool
    /// but serializes each example's update behind a lock.
    pub fn train_epoch(&self, samples: &[Sample], mode: ExecutionMode) -> Result<()> {
        match mode {
            ExecutionMode::Sequential => samples
                .iter()
                .try_for_each(|sample| self.train_sample(sample)),
            ExecutionMode::Parallel => samples
                .par_iter()
                .try_for_each(|sample| self.train_sample(sample)),
            ExecutionMode::Synchronized => {
                let lock = Mutex::new(());
                samples.par_iter().try_for_each(|sample| {
                    let _guard = lock.lock();
                    self.train_sample(sample)
                })
            }
        }
    }

    /// Returns `true` if the first output is above [`DECISION_THRESHOLD`].
    pub fn classify(&self, inputs: &[f64]) -> Result<bool> {
        let outputs = self.feed_forward(inputs)?;
        outputs
            .first()
            .map(|&output| output > DECISION_THRESHOLD)
            .ok_or_else(|| NetworkError::InvalidInput("network produced no output".to_string()))
    }

    /// Fraction of `samples` whose thresholded prediction matches the thresholded target.
    ///
    /// An empty slice scores `0.0`.
    pub fn test(&self, samples: &[Sample]) -> Result<f64> {
        if samples.is_empty() {
            return Ok(0.0);
        }
        let mut correct = 0usize;
        for sample in samples {
            let actual = sample
                .label()
                .ok_or_else(|| NetworkError::shape("targets", self.output_width(), 0))?;
            if self.classify(&sample.inputs)? == (actual > DECISION_THRESHOLD) {
                correct += 1;
            }
        }
        Ok(correct as f64 / samples.len() as f64)
    }

    /// Checks every sample's input and target widths against the network.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::DataShapeMismatch`] carrying the index of the first
    /// offending sample.
    pub fn validate(&self, samples: &[Sample]) -> Result<()> {
        let output_width = self.output_width();
        for (index, sample) in samples.iter().enumerate() {
            if sample.inputs.len() != self.input_width {
                return Err(
                    NetworkError::shape("inputs", self.input_width, sample.inputs.len())
                        .at_sample(index),
                );
            }
            if sample.targets.len() != output_width {
                return Err(
                    NetworkError::shape("targets", output_width, sample.targets.len())
                        .at_sample(index),
                );
            }
        }
        Ok(())
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn input_width(&self) -> usize {
        self.input_width
    }

    pub fn output_width(&self) -> usize {
        self.layers.last().map_or(0, Layer::width)
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn set_learning_rate(&mut self, learning_rate: f64) {
        self.learning_rate = learning_rate;
    }

    pub fn momentum(&self) -> f64 {
        self.momentum
    }

    pub fn set_momentum(&mut self, momentum: f64) {
        self.momentum = momentum;
    }
}

impl fmt::Display for Network {
    /// Formats the architecture as `inputs-hidden...-outputs`, e.g. `15-10-5-1`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.input_width)?;
        for layer in &self.layers {
            write!(f, "-{}", layer.width())?;
        }
        Ok(())
    }
}

pub(crate) fn validate_architecture(
    input_width: usize,
    hidden_layers: &[usize],
    output_width: usize,
) -> Result<()> {
    if hidden_layers.is_empty() {
        return Err(NetworkError::InvalidArchitecture(
            "at least one hidden layer is required".to_string(),
        ));
    }
    if input_width == 0 {
        return Err(NetworkError::InvalidArchitecture(
            "input width must be positive".to_string(),
        ));
    }
    if output_width == 0 {
        return Err(NetworkError::InvalidArchitecture(
            "output width must be positive".to_string(),
        ));
    }
    if let Some(position) = hidden_layers.iter().position(|&nodes| nodes == 0) {
        return Err(NetworkError::InvalidArchitecture(format!(
            "hidden layer {position} has no neurons"
        )));
    }
    Ok(())
}
