//! Metrics recorded over a training run.
//!
//! A [`MetricsRecorder`] is updated at every evaluation and then consumed by
//! [`MetricsRecorder::finalize`], which computes the derived fields and returns an
//! immutable [`TrainingMetrics`].
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Accuracy on the test set and loss on the training set at one evaluated epoch.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub accuracy: f64,
    pub loss: f64,
}

/// Why the training loop ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    MaxEpochs,
    EarlyStopping { epoch: usize },
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::MaxEpochs => write!(f, "maximum epochs reached"),
            StopReason::EarlyStopping { epoch } => write!(f, "early stopping at epoch {epoch}"),
        }
    }
}

/// Mutable metrics for a run in progress.
#[derive(Debug, Clone, Default)]
pub struct MetricsRecorder {
    history: BTreeMap<usize, EpochMetrics>,
    best_accuracy: f64,
    best_epoch: usize,
    /// Loss measured at the best epoch
    final_loss: f64,
    no_improvement_count: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an evaluation and returns `true` if it set a new best.
    ///
    /// Accuracy only counts as a new best when it beats the previous best by more
    /// than `min_improvement`; anything else bumps the no-improvement counter.
    pub fn record(&mut self, epoch: usize, accuracy: f64, loss: f64, min_improvement: f64) -> bool {
        self.history.insert(epoch, EpochMetrics { accuracy, loss });

        if accuracy > self.best_accuracy + min_improvement {
            self.best_accuracy = accuracy;
            self.best_epoch = epoch;
            self.final_loss = loss;
            self.no_improvement_count = 0;
            true
        } else {
            self.no_improvement_count += 1;
            false
        }
    }

    pub fn best_accuracy(&self) -> f64 {
        self.best_accuracy
    }

    pub fn best_epoch(&self) -> usize {
        self.best_epoch
    }

    pub fn no_improvement_count(&self) -> usize {
        self.no_improvement_count
    }

    pub fn history(&self) -> &BTreeMap<usize, EpochMetrics> {
        &self.history
    }

    /// Computes the derived fields and freezes the record.
    ///
    /// Total epochs is one past the last evaluated epoch, or zero if nothing was
    /// evaluated.
    pub fn finalize(self, elapsed: Duration, stop_reason: StopReason) -> TrainingMetrics {
        let total_epochs = self
            .history
            .last_key_value()
            .map_or(0, |(&epoch, _)| epoch + 1);
        let seconds = elapsed.as_secs_f64();
        let epochs_per_second = if seconds > 0.0 {
            total_epochs as f64 / seconds
        } else {
            0.0
        };

        TrainingMetrics {
            elapsed,
            total_epochs,
            best_accuracy: self.best_accuracy,
            best_epoch: self.best_epoch,
            final_loss: self.final_loss,
            epochs_per_second,
            no_improvement_count: self.no_improvement_count,
            stop_reason,
            history: self.history,
        }
    }
}

/// The finished record of one training run.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingMetrics {
    elapsed: Duration,
    total_epochs: usize,
    best_accuracy: f64,
    best_epoch: usize,
    final_loss: f64,
    epochs_per_second: f64,
    no_improvement_count: usize,
    stop_reason: StopReason,
    history: BTreeMap<usize, EpochMetrics>,
}

impl TrainingMetrics {
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn total_epochs(&self) -> usize {
        self.total_epochs
    }

    pub fn best_accuracy(&self) -> f64 {
        self.best_accuracy
    }

    pub fn best_epoch(&self) -> usize {
        self.best_epoch
    }

    /// Training loss at the best epoch.
    pub fn final_loss(&self) -> f64 {
        self.final_loss
    }

    pub fn epochs_per_second(&self) -> f64 {
        self.epochs_per_second
    }

    pub fn no_improvement_count(&self) -> usize {
        self.no_improvement_count
    }

    pub fn stop_reason(&self) -> StopReason {
        self.stop_reason
    }

    /// Evaluated epochs and their metrics. Reporters compare two runs on the
    /// intersection of their keys.
    pub fn history(&self) -> &BTreeMap<usize, EpochMetrics> {
        &self.history
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            elapsed_seconds: self.elapsed.as_secs_f64(),
            total_epochs: self.total_epochs,
            epochs_per_second: self.epochs_per_second,
            best_accuracy: self.best_accuracy,
            best_epoch: self.best_epoch,
            final_loss: self.final_loss,
            evaluations: self.history.len(),
            stop_reason: self.stop_reason,
        }
    }
}

/// Flat summary of a run for reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub elapsed_seconds: f64,
    pub total_epochs: usize,
    pub epochs_per_second: f64,
    pub best_accuracy: f64,
    pub best_epoch: usize,
    pub final_loss: f64,
    pub evaluations: usize,
    pub stop_reason: StopReason,
}

impl MetricsSummary {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Training Summary:")?;
        writeln!(f, "-----------------")?;
        writeln!(f, "Total time: {:.2}s", self.elapsed_seconds)?;
        writeln!(f, "Epochs run: {}", self.total_epochs)?;
        writeln!(f, "Epochs/second: {:.2}", self.epochs_per_second)?;
        writeln!(
            f,
            "Best accuracy: {:.2}% (epoch {})",
            self.best_accuracy * 100.0,
            self.best_epoch
        )?;
        writeln!(f, "Final loss: {:.4}", self.final_loss)?;
        write!(f, "Stopped: {}", self.stop_reason)
    }
}
