use crate::training_config::TrainingConfigBuilderError;
use neural_network::NetworkError;
use thiserror::Error;

/// Errors that can occur while running a training loop
#[derive(Debug, Error)]
pub enum TrainingError {
    /// The model rejected a sample or failed a forward/backward pass
    #[error(transparent)]
    Network(#[from] NetworkError),
    /// Loss and accuracy are undefined over an empty set
    #[error("The {0} set is empty")]
    EmptyDataset(&'static str),
    /// The dedicated worker pool could not be created
    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    /// The progress bar template did not parse
    #[error("Invalid progress template: {0}")]
    ProgressTemplate(#[from] indicatif::style::TemplateError),
    /// The training configuration failed validation
    #[error("Invalid training config: {0}")]
    InvalidConfig(#[from] TrainingConfigBuilderError),
}
