//! Training loop for the neural network.
//!
//! This module provides:
//! - The [`Trainable`] seam between the loop and the model it drives
//! - The epoch loop with scheduled evaluation and early stopping
//! - Progress visualization using a progress bar
//! - Metrics aggregation into a [`TrainingMetrics`] record

use crate::error::TrainingError;
use crate::metrics::{MetricsRecorder, StopReason, TrainingMetrics};
use crate::schedule::{EarlyStopping, EvaluationSchedule};
use crate::training_config::TrainingConfig;
use indicatif::{ProgressBar, ProgressStyle};
use neural_network::{DECISION_THRESHOLD, ExecutionMode, Network, NetworkError, Sample};
use rayon::ThreadPoolBuilder;
use std::time::Instant;
use tracing::{debug, info};

/// A model the training loop can drive.
pub trait Trainable: Send {
    /// Rejects samples whose shape the model cannot consume.
    fn validate(&self, samples: &[Sample]) -> Result<(), NetworkError>;

    /// Runs one full pass over `samples`.
    fn train_epoch(&mut self, samples: &[Sample], mode: ExecutionMode) -> Result<(), NetworkError>;

    fn predict(&self, inputs: &[f64]) -> Result<Vec<f64>, NetworkError>;

    /// Fraction of `samples` whose first output lands on the same side of
    /// [`DECISION_THRESHOLD`] as the label. An empty slice scores `0.0`.
    fn accuracy(&self, samples: &[Sample]) -> Result<f64, NetworkError> {
        if samples.is_empty() {
            return Ok(0.0);
        }
        let mut correct = 0usize;
        for (index, sample) in samples.iter().enumerate() {
            let (output, target) = first_output_and_label(self, index, sample)?;
            if (output > DECISION_THRESHOLD) == (target > DECISION_THRESHOLD) {
                correct += 1;
            }
        }
        Ok(correct as f64 / samples.len() as f64)
    }

    /// Mean squared error of the first output over `samples`.
    fn mean_squared_error(&self, samples: &[Sample]) -> Result<f64, NetworkError> {
        if samples.is_empty() {
            return Ok(0.0);
        }
        let mut loss = 0.0;
        for (index, sample) in samples.iter().enumerate() {
            let (output, target) = first_output_and_label(self, index, sample)?;
            loss += (output - target).powi(2);
        }
        Ok(loss / samples.len() as f64)
    }
}

fn first_output_and_label<M: Trainable + ?Sized>(
    model: &M,
    index: usize,
    sample: &Sample,
) -> Result<(f64, f64), NetworkError> {
    let missing = |field| NetworkError::DataShapeMismatch {
        index: Some(index),
        field,
        expected: 1,
        actual: 0,
    };
    let output = model
        .predict(&sample.inputs)?
        .first()
        .copied()
        .ok_or_else(|| missing("outputs"))?;
    let target = sample.label().ok_or_else(|| missing("targets"))?;
    Ok((output, target))
}

impl Trainable for Network {
    fn validate(&self, samples: &[Sample]) -> Result<(), NetworkError> {
        Network::validate(self, samples)
    }

    fn train_epoch(&mut self, samples: &[Sample], mode: ExecutionMode) -> Result<(), NetworkError> {
        Network::train_epoch(self, samples, mode)
    }

    fn predict(&self, inputs: &[f64]) -> Result<Vec<f64>, NetworkError> {
        self.feed_forward(inputs)
    }

    fn accuracy(&self, samples: &[Sample]) -> Result<f64, NetworkError> {
        self.test(samples)
    }
}

impl<T: Trainable + ?Sized> Trainable for &mut T {
    fn validate(&self, samples: &[Sample]) -> Result<(), NetworkError> {
        (**self).validate(samples)
    }

    fn train_epoch(&mut self, samples: &[Sample], mode: ExecutionMode) -> Result<(), NetworkError> {
        (**self).train_epoch(samples, mode)
    }

    fn predict(&self, inputs: &[f64]) -> Result<Vec<f64>, NetworkError> {
        (**self).predict(inputs)
    }

    fn accuracy(&self, samples: &[Sample]) -> Result<f64, NetworkError> {
        (**self).accuracy(samples)
    }

    fn mean_squared_error(&self, samples: &[Sample]) -> Result<f64, NetworkError> {
        (**self).mean_squared_error(samples)
    }
}

/// Where the training loop currently is.
///
/// `Running` trains one epoch and moves to `Evaluating` on scheduled epochs.
/// `Evaluating` either resumes `Running` or moves to `Stopped`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrainingState {
    Running,
    Evaluating,
    Stopped(StopReason),
}

/// Trainer manages the neural network training process.
///
/// The trainer handles:
/// - Input validation before the first epoch
/// - Epoch execution in the configured [`ExecutionMode`]
/// - Scheduled evaluation of loss and accuracy
/// - Early stopping
/// - Progress visualization
pub struct Trainer<M: Trainable = Network> {
    model: M,
    config: TrainingConfig,
    schedule: EvaluationSchedule,
}

impl<M: Trainable> Trainer<M> {
    /// Creates a new trainer with the default evaluation schedule.
    pub fn new(model: M, config: TrainingConfig) -> Self {
        Self {
            model,
            config,
            schedule: EvaluationSchedule::default(),
        }
    }

    #[must_use]
    pub fn with_schedule(mut self, schedule: EvaluationSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn into_model(self) -> M {
        self.model
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Trains until `max_epochs` is exhausted or early stopping fires.
    ///
    /// Loss is measured on `training_set` and accuracy on `test_set`, at the epochs
    /// chosen by the evaluation schedule.
    ///
    /// # Errors
    ///
    /// Fails before the first epoch if either set is empty or contains a sample the
    /// model rejects, and at any point a forward or backward pass fails.
    pub fn train(
        &mut self,
        training_set: &[Sample],
        test_set: &[Sample],
    ) -> Result<TrainingMetrics, TrainingError> {
        if training_set.is_empty() {
            return Err(TrainingError::EmptyDataset("training"));
        }
        if test_set.is_empty() {
            return Err(TrainingError::EmptyDataset("test"));
        }
        self.model.validate(training_set)?;
        self.model.validate(test_set)?;

        match self.config.worker_threads {
            Some(threads) => {
                let pool = ThreadPoolBuilder::new().num_threads(threads).build()?;
                pool.install(|| self.run(training_set, test_set))
            }
            None => self.run(training_set, test_set),
        }
    }

    fn run(
        &mut self,
        training_set: &[Sample],
        test_set: &[Sample],
    ) -> Result<TrainingMetrics, TrainingError> {
        let mode = self.config.mode;
        let max_epochs = self.config.max_epochs;
        let min_improvement = self.config.min_improvement;
        let stopping = EarlyStopping::new(
            self.config.effective_patience(),
            self.config.min_stopping_epoch,
        );
        let progress = self.progress_bar()?;
        debug!(
            ?mode,
            max_epochs,
            patience = stopping.patience,
            training_samples = training_set.len(),
            test_samples = test_set.len(),
            "starting training"
        );

        let mut recorder = MetricsRecorder::new();
        let mut epoch = 0;
        let mut state = TrainingState::Running;
        let started = Instant::now();

        let stop_reason = loop {
            state = match state {
                TrainingState::Running if epoch >= max_epochs => {
                    TrainingState::Stopped(StopReason::MaxEpochs)
                }
                TrainingState::Running => {
                    self.model.train_epoch(training_set, mode)?;
                    progress.inc(1);
                    if self.schedule.should_evaluate(epoch) {
                        TrainingState::Evaluating
                    } else {
                        epoch += 1;
                        TrainingState::Running
                    }
                }
                TrainingState::Evaluating => {
                    let loss = self.model.mean_squared_error(training_set)?;
                    let accuracy = self.model.accuracy(test_set)?;
                    recorder.record(epoch, accuracy, loss, min_improvement);

                    info!(
                        epoch,
                        accuracy,
                        loss,
                        best_accuracy = recorder.best_accuracy(),
                        best_epoch = recorder.best_epoch(),
                        "evaluation"
                    );
                    progress.set_message(format!(
                        "- Accuracy: {:.2}%, Loss: {:.4}",
                        accuracy * 100.0,
                        loss
                    ));

                    if stopping.should_stop(epoch, recorder.no_improvement_count()) {
                        info!(
                            epoch,
                            patience = stopping.patience,
                            "early stopping, no significant improvement"
                        );
                        TrainingState::Stopped(StopReason::EarlyStopping { epoch })
                    } else {
                        epoch += 1;
                        TrainingState::Running
                    }
                }
                TrainingState::Stopped(reason) => break reason,
            };
        };
        let elapsed = started.elapsed();

        match stop_reason {
            StopReason::EarlyStopping { epoch } => progress.finish_with_message(format!(
                "Early stopping at epoch {} with best accuracy: {:.2}%",
                epoch,
                recorder.best_accuracy() * 100.0
            )),
            StopReason::MaxEpochs => progress.finish_with_message("Training completed!"),
        }

        let metrics = recorder.finalize(elapsed, stop_reason);
        debug!(
            total_epochs = metrics.total_epochs(),
            epochs_per_second = metrics.epochs_per_second(),
            "training finished"
        );
        Ok(metrics)
    }

    fn progress_bar(&self) -> Result<ProgressBar, TrainingError> {
        if !self.config.show_progress {
            return Ok(ProgressBar::hidden());
        }
        let progress = ProgressBar::new(self.config.max_epochs as u64);
        progress.set_style(create_progress_style(
            "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} Epoch {msg}",
        )?);
        Ok(progress)
    }
}

/// Trains `network` with the default configuration for `mode`.
///
/// # Example
///
/// ```
/// use neural_network::{ExecutionMode, Network, Sample};
///
/// let mut network = Network::new(2, &[4], 1).unwrap();
/// let samples = vec![
///     Sample::new(vec![0.0, 1.0], vec![0.0]),
///     Sample::new(vec![1.0, 1.0], vec![1.0]),
/// ];
/// let metrics = training::train(&mut network, &samples, &samples, ExecutionMode::Sequential, 20).unwrap();
/// assert_eq!(metrics.total_epochs(), 11);
/// ```
pub fn train(
    network: &mut Network,
    training_set: &[Sample],
    test_set: &[Sample],
    mode: ExecutionMode,
    max_epochs: usize,
) -> Result<TrainingMetrics, TrainingError> {
    let config = TrainingConfig {
        max_epochs,
        ..TrainingConfig::for_mode(mode)
    };
    Trainer::new(network, config).train(training_set, test_set)
}

fn create_progress_style(template: &str) -> Result<ProgressStyle, TrainingError> {
    Ok(ProgressStyle::with_template(template)?.progress_chars("##-"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::FIXED_EVALUATION_EPOCHS;
    use crate::training_config::TrainingConfigBuilder;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    /// A model whose accuracy follows a fixed curve over epochs
    struct ScriptedModel {
        accuracy_at: fn(usize) -> f64,
        epochs_trained: usize,
    }

    impl ScriptedModel {
        fn new(accuracy_at: fn(usize) -> f64) -> Self {
            Self {
                accuracy_at,
                epochs_trained: 0,
            }
        }
    }

    impl Trainable for ScriptedModel {
        fn validate(&self, _samples: &[Sample]) -> Result<(), NetworkError> {
            Ok(())
        }

        fn train_epoch(&mut self, _samples: &[Sample], _mode: ExecutionMode) -> Result<(), NetworkError> {
            self.epochs_trained += 1;
            Ok(())
        }

        fn predict(&self, _inputs: &[f64]) -> Result<Vec<f64>, NetworkError> {
            Ok(vec![0.0])
        }

        fn accuracy(&self, _samples: &[Sample]) -> Result<f64, NetworkError> {
            Ok((self.accuracy_at)(self.epochs_trained.saturating_sub(1)))
        }

        fn mean_squared_error(&self, _samples: &[Sample]) -> Result<f64, NetworkError> {
            Ok(0.1)
        }
    }

    /// A model that always predicts the same output
    struct ConstantModel(f64);

    impl Trainable for ConstantModel {
        fn validate(&self, _samples: &[Sample]) -> Result<(), NetworkError> {
            Ok(())
        }

        fn train_epoch(&mut self, _samples: &[Sample], _mode: ExecutionMode) -> Result<(), NetworkError> {
            Ok(())
        }

        fn predict(&self, _inputs: &[f64]) -> Result<Vec<f64>, NetworkError> {
            Ok(vec![self.0])
        }
    }

    fn placeholder_samples() -> Vec<Sample> {
        vec![Sample::new(vec![0.0], vec![0.0])]
    }

    fn and_samples() -> Vec<Sample> {
        vec![
            Sample::new(vec![0.0, 0.0], vec![0.0]),
            Sample::new(vec![0.0, 1.0], vec![0.0]),
            Sample::new(vec![1.0, 0.0], vec![0.0]),
            Sample::new(vec![1.0, 1.0], vec![1.0]),
        ]
    }

    fn quiet_config(mode: ExecutionMode, patience: usize) -> TrainingConfig {
        TrainingConfigBuilder::default()
            .mode(mode)
            .patience(patience)
            .show_progress(false)
            .build()
            .unwrap()
    }

    #[test]
    fn test_plateau_stops_at_first_eligible_evaluation() -> Result<(), TrainingError> {
        let samples = placeholder_samples();
        let mut trainer = Trainer::new(
            ScriptedModel::new(|_| 0.8),
            quiet_config(ExecutionMode::Sequential, 3),
        );
        let metrics = trainer.train(&samples, &samples)?;

        // The counter reaches 3 at epoch 30, but stopping waits for an epoch past 100.
        assert_eq!(
            metrics.stop_reason(),
            StopReason::EarlyStopping { epoch: 125 }
        );
        assert_eq!(
            metrics.history().keys().copied().collect::<Vec<_>>(),
            vec![0, 10, 20, 30, 50, 100, 125]
        );
        assert_eq!(metrics.total_epochs(), 126);
        assert_eq!(trainer.model().epochs_trained, 126);
        assert_eq!(metrics.best_accuracy(), 0.8);
        assert_eq!(metrics.best_epoch(), 0);
        assert_eq!(metrics.no_improvement_count(), 6);
        Ok(())
    }

    #[test]
    fn test_plateau_stops_when_counter_reaches_patience() -> Result<(), TrainingError> {
        let samples = placeholder_samples();
        let mut trainer = Trainer::new(
            ScriptedModel::new(|epoch| if epoch <= 200 { epoch as f64 / 400.0 } else { 0.5 }),
            quiet_config(ExecutionMode::Sequential, 4),
        );
        let metrics = trainer.train(&samples, &samples)?;

        assert_eq!(
            metrics.stop_reason(),
            StopReason::EarlyStopping { epoch: 300 }
        );
        assert_eq!(metrics.best_epoch(), 200);
        assert_eq!(metrics.best_accuracy(), 0.5);
        assert_eq!(metrics.no_improvement_count(), 4);
        assert_eq!(metrics.total_epochs(), 301);
        assert_eq!(trainer.model().epochs_trained, 301);
        assert_eq!(metrics.history().keys().last(), Some(&300));
        Ok(())
    }

    #[test]
    fn test_full_run_history_matches_schedule() -> Result<(), TrainingError> {
        let samples = placeholder_samples();
        let config = TrainingConfigBuilder::default()
            .mode(ExecutionMode::Sequential)
            .show_progress(false)
            .build()?;
        let mut trainer = Trainer::new(ScriptedModel::new(|_| 0.6), config);
        let metrics = trainer.train(&samples, &samples)?;

        let expected: Vec<usize> = (0..1000)
            .filter(|&e| FIXED_EVALUATION_EPOCHS.contains(&e) || (e > 100 && e % 25 == 0))
            .collect();
        assert_eq!(
            metrics.history().keys().copied().collect::<Vec<_>>(),
            expected
        );
        assert_eq!(metrics.stop_reason(), StopReason::MaxEpochs);
        assert_eq!(metrics.total_epochs(), 1000);
        assert_eq!(trainer.model().epochs_trained, 1000);
        Ok(())
    }

    #[test]
    fn test_parallel_patience_outlasts_sequential() -> Result<(), TrainingError> {
        // Flat accuracy from epoch 0: 5 misses up to epoch 100, one per 25 epochs after
        // that, and one more for the fixed point at 999.
        let samples = placeholder_samples();
        let run = |mode: ExecutionMode| -> Result<TrainingMetrics, TrainingError> {
            let config = TrainingConfigBuilder::default()
                .mode(mode)
                .max_epochs(5000)
                .show_progress(false)
                .build()?;
            Trainer::new(ScriptedModel::new(|_| 0.6), config).train(&samples, &samples)
        };

        let sequential = run(ExecutionMode::Sequential)?;
        let parallel = run(ExecutionMode::Parallel)?;

        assert_eq!(
            sequential.stop_reason(),
            StopReason::EarlyStopping { epoch: 100 + 25 * 44 }
        );
        assert_eq!(
            parallel.stop_reason(),
            StopReason::EarlyStopping { epoch: 100 + 25 * 69 }
        );
        Ok(())
    }

    #[test]
    fn test_improving_model_never_stops() -> Result<(), TrainingError> {
        let samples = placeholder_samples();
        let mut trainer = Trainer::new(
            ScriptedModel::new(|epoch| epoch as f64 / 1000.0),
            quiet_config(ExecutionMode::Sequential, 1),
        );
        let metrics = trainer.train(&samples, &samples)?;

        assert_eq!(metrics.stop_reason(), StopReason::MaxEpochs);
        assert_eq!(metrics.best_epoch(), 999);
        assert_eq!(metrics.no_improvement_count(), 0);
        assert_relative_eq!(metrics.final_loss(), 0.1);
        Ok(())
    }

    #[test]
    fn test_zero_epochs() -> Result<(), TrainingError> {
        let samples = placeholder_samples();
        let config = TrainingConfigBuilder::default()
            .max_epochs(0)
            .show_progress(false)
            .build()?;
        let mut trainer = Trainer::new(ScriptedModel::new(|_| 1.0), config);
        let metrics = trainer.train(&samples, &samples)?;

        assert_eq!(metrics.total_epochs(), 0);
        assert!(metrics.history().is_empty());
        assert_eq!(trainer.model().epochs_trained, 0);
        Ok(())
    }

    #[test]
    fn test_empty_datasets_rejected() {
        let samples = placeholder_samples();
        let mut trainer = Trainer::new(
            ScriptedModel::new(|_| 1.0),
            quiet_config(ExecutionMode::Sequential, 1),
        );

        assert!(matches!(
            trainer.train(&[], &samples),
            Err(TrainingError::EmptyDataset("training"))
        ));
        assert!(matches!(
            trainer.train(&samples, &[]),
            Err(TrainingError::EmptyDataset("test"))
        ));
        assert_eq!(trainer.model().epochs_trained, 0);
    }

    #[test]
    fn test_default_mean_squared_error() -> Result<(), NetworkError> {
        let model = ConstantModel(0.75);
        let samples = vec![
            Sample::new(vec![0.0], vec![1.0]),
            Sample::new(vec![0.0], vec![0.0]),
        ];
        assert_relative_eq!(model.mean_squared_error(&samples)?, 0.3125);
        assert_eq!(model.mean_squared_error(&[])?, 0.0);

        let unlabeled = vec![Sample::new(vec![0.0], vec![])];
        assert!(matches!(
            model.mean_squared_error(&unlabeled),
            Err(NetworkError::DataShapeMismatch { index: Some(0), field: "targets", .. })
        ));
        Ok(())
    }

    #[test]
    fn test_default_accuracy() -> Result<(), NetworkError> {
        let samples = vec![
            Sample::new(vec![0.0], vec![1.0]),
            Sample::new(vec![0.0], vec![0.0]),
            Sample::new(vec![0.0], vec![1.0]),
            Sample::new(vec![0.0], vec![1.0]),
        ];
        assert_eq!(ConstantModel(0.9).accuracy(&samples)?, 0.75);
        assert_eq!(ConstantModel(0.5).accuracy(&samples)?, 0.25);
        assert_eq!(ConstantModel(0.9).accuracy(&[])?, 0.0);
        Ok(())
    }

    #[test]
    fn test_network_accuracy_matches_test() -> Result<(), NetworkError> {
        let network = Network::with_rng(2, &[3], 1, &mut StdRng::seed_from_u64(11))?;
        let samples = and_samples();
        assert_eq!(Trainable::accuracy(&network, &samples)?, network.test(&samples)?);
        Ok(())
    }

    #[test]
    fn test_shape_mismatch_fails_before_training() -> Result<(), NetworkError> {
        let network = Network::with_rng(2, &[3], 1, &mut StdRng::seed_from_u64(4))?;
        let mut trainer = Trainer::new(network, quiet_config(ExecutionMode::Sequential, 5));
        let bad = vec![Sample::new(vec![1.0, 0.0, 1.0], vec![1.0])];

        assert!(matches!(
            trainer.train(&and_samples(), &bad),
            Err(TrainingError::Network(NetworkError::DataShapeMismatch {
                index: Some(0),
                ..
            }))
        ));
        Ok(())
    }

    #[test]
    fn test_train_and_end_to_end() -> Result<(), TrainingError> {
        let mut network = Network::with_rng(2, &[10], 1, &mut StdRng::seed_from_u64(42))?;
        network.set_learning_rate(0.1);
        let samples = and_samples();

        let metrics = train(&mut network, &samples, &samples, ExecutionMode::Sequential, 500)?;

        assert!(metrics.best_accuracy() >= 0.75);
        assert!(metrics.total_epochs() <= 500);
        assert!(metrics.history().contains_key(&0));
        assert!(network.test(&samples)? >= 0.0);
        Ok(())
    }

    #[test]
    fn test_parallel_with_dedicated_pool() -> Result<(), TrainingError> {
        let mut network = Network::with_rng(2, &[10], 1, &mut StdRng::seed_from_u64(7))?;
        network.set_learning_rate(0.1);
        let training_set: Vec<Sample> = and_samples().into_iter().cycle().take(64).collect();
        let config = TrainingConfigBuilder::default()
            .mode(ExecutionMode::Parallel)
            .max_epochs(150)
            .worker_threads(2)
            .show_progress(false)
            .build()?;

        let mut trainer = Trainer::new(network, config);
        let metrics = trainer.train(&training_set, &and_samples())?;

        assert!(metrics.best_accuracy() >= 0.75);
        assert!(metrics.total_epochs() <= 150);
        assert_eq!(trainer.into_model().to_string(), "2-10-1");
        Ok(())
    }

    #[test]
    fn test_custom_schedule() -> Result<(), TrainingError> {
        let samples = placeholder_samples();
        let config = TrainingConfigBuilder::default()
            .max_epochs(10)
            .show_progress(false)
            .build()?;
        let mut trainer = Trainer::new(ScriptedModel::new(|_| 0.5), config)
            .with_schedule(EvaluationSchedule::new([2, 4], 5, 3));
        let metrics = trainer.train(&samples, &samples)?;

        assert_eq!(
            metrics.history().keys().copied().collect::<Vec<_>>(),
            vec![2, 4, 6, 9]
        );
        assert_eq!(metrics.total_epochs(), 10);
        Ok(())
    }
}
