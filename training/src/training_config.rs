use derive_builder::Builder;
use neural_network::ExecutionMode;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_EPOCHS: usize = 1000;
pub const PARALLEL_PATIENCE: usize = 75;
pub const SEQUENTIAL_PATIENCE: usize = 50;
pub const SIGNIFICANT_IMPROVEMENT: f64 = 0.005;
pub const MIN_STOPPING_EPOCH: usize = 100;

/// Configuration parameters for a training run.
///
/// # Example
///
/// ```
/// use neural_network::ExecutionMode;
/// use training::TrainingConfigBuilder;
///
/// let config = TrainingConfigBuilder::default()
///     .mode(ExecutionMode::Sequential)
///     .max_epochs(500)
///     .build()
///     .unwrap();
/// assert_eq!(config.effective_patience(), 50);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(default, build_fn(validate = "Self::validate"))]
pub struct TrainingConfig {
    /// Upper bound on the number of epochs
    pub max_epochs: usize,
    /// How each epoch schedules its examples
    pub mode: ExecutionMode,
    /// Evaluations without significant improvement before stopping early.
    /// `None` picks a default based on the mode.
    #[builder(setter(strip_option))]
    pub patience: Option<usize>,
    /// Minimum accuracy gain over the best so far that counts as an improvement
    pub min_improvement: f64,
    /// Early stopping only fires after this epoch
    pub min_stopping_epoch: usize,
    /// Size of a dedicated worker pool. `None` runs on the global rayon pool.
    #[builder(setter(strip_option))]
    pub worker_threads: Option<usize>,
    /// Draw a progress bar on the terminal
    pub show_progress: bool,
}

impl TrainingConfig {
    /// Default configuration for `mode`.
    pub fn for_mode(mode: ExecutionMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// The configured patience, or the mode's default.
    ///
    /// Parallel updates converge less smoothly, so they get more evaluations to
    /// recover before training stops.
    pub fn effective_patience(&self) -> usize {
        self.patience.unwrap_or(if self.mode.is_sequential() {
            SEQUENTIAL_PATIENCE
        } else {
            PARALLEL_PATIENCE
        })
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            max_epochs: DEFAULT_MAX_EPOCHS,
            mode: ExecutionMode::Parallel,
            patience: None,
            min_improvement: SIGNIFICANT_IMPROVEMENT,
            min_stopping_epoch: MIN_STOPPING_EPOCH,
            worker_threads: None,
            show_progress: true,
        }
    }
}

impl TrainingConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(Some(0)) = self.patience {
            return Err("patience must be positive".to_string());
        }
        if let Some(Some(0)) = self.worker_threads {
            return Err("worker_threads must be positive".to_string());
        }
        match self.min_improvement {
            Some(min) if min.is_nan() || min < 0.0 => Err(format!(
                "min_improvement must be non-negative, got {min}"
            )),
            _ => Ok(()),
        }
    }
}
