//! When to evaluate, and when to give up.
use std::collections::BTreeSet;

/// Epochs that are always evaluated so runs in different modes share comparison points.
pub const FIXED_EVALUATION_EPOCHS: [usize; 15] = [
    0, 10, 20, 30, 50, 100, 200, 300, 400, 500, 600, 700, 800, 900, 999,
];

/// Decides after which epochs the trainer measures loss and accuracy.
///
/// An epoch is evaluated if it is one of the fixed points, or if it lies past
/// `dense_after` and is a multiple of `interval`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvaluationSchedule {
    fixed: BTreeSet<usize>,
    dense_after: usize,
    interval: usize,
}

impl EvaluationSchedule {
    pub fn new(fixed: impl IntoIterator<Item = usize>, dense_after: usize, interval: usize) -> Self {
        Self {
            fixed: fixed.into_iter().collect(),
            dense_after,
            interval,
        }
    }

    pub fn should_evaluate(&self, epoch: usize) -> bool {
        self.fixed.contains(&epoch)
            || (epoch > self.dense_after && self.interval > 0 && epoch % self.interval == 0)
    }

    /// All evaluated epochs below `max_epochs`, in order.
    pub fn epochs(&self, max_epochs: usize) -> impl Iterator<Item = usize> + '_ {
        (0..max_epochs).filter(|&epoch| self.should_evaluate(epoch))
    }
}

impl Default for EvaluationSchedule {
    fn default() -> Self {
        Self::new(FIXED_EVALUATION_EPOCHS, 100, 25)
    }
}

/// Stops training once accuracy has stalled for `patience` evaluations past `min_epoch`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EarlyStopping {
    pub patience: usize,
    pub min_epoch: usize,
}

impl EarlyStopping {
    pub fn new(patience: usize, min_epoch: usize) -> Self {
        Self {
            patience,
            min_epoch,
        }
    }

    pub fn should_stop(&self, epoch: usize, no_improvement_count: usize) -> bool {
        no_improvement_count >= self.patience && epoch > self.min_epoch
    }
}
