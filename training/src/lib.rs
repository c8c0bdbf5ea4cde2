mod error;
mod metrics;
mod schedule;
mod training;
mod training_config;

pub use error::TrainingError;
pub use metrics::{EpochMetrics, MetricsRecorder, MetricsSummary, StopReason, TrainingMetrics};
pub use schedule::{EarlyStopping, EvaluationSchedule, FIXED_EVALUATION_EPOCHS};
pub use training::{Trainable, Trainer, TrainingState, train};
pub use training_config::{
    DEFAULT_MAX_EPOCHS, MIN_STOPPING_EPOCH, PARALLEL_PATIENCE, SEQUENTIAL_PATIENCE,
    SIGNIFICANT_IMPROVEMENT, TrainingConfig, TrainingConfigBuilder, TrainingConfigBuilderError,
};

pub mod prelude {
    pub use crate::Trainable;
    pub use crate::Trainer;
    pub use crate::TrainingConfig;
    pub use crate::TrainingMetrics;
}
