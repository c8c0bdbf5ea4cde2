use serde::{Deserialize, Serialize};

/// A labeled example: a fixed-width feature vector and its target vector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub inputs: Vec<f64>,
    pub targets: Vec<f64>,
}

impl Sample {
    pub fn new(inputs: Vec<f64>, targets: Vec<f64>) -> Self {
        Self { inputs, targets }
    }

    /// Returns the first target, which holds the class label for single-output networks.
    pub fn label(&self) -> Option<f64> {
        self.targets.first().copied()
    }
}

impl From<(Vec<f64>, Vec<f64>)> for Sample {
    fn from((inputs, targets): (Vec<f64>, Vec<f64>)) -> Self {
        Self::new(inputs, targets)
    }
}

/// How an epoch distributes its examples across threads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionMode {
    /// One example at a time, in dataset order.
    Sequential,
    /// Examples run concurrently on the rayon pool and update shared weights
    /// without any locking. Updates race and results are not reproducible.
    #[default]
    Parallel,
    /// Examples run on the rayon pool, but each forward/backward/update step
    /// holds a lock so updates never interleave. Example order is unspecified.
    Synchronized,
}

impl ExecutionMode {
    pub fn is_sequential(self) -> bool {
        matches!(self, ExecutionMode::Sequential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_label() {
        let sample = Sample::new(vec![0.0, 1.0], vec![1.0]);
        assert_eq!(sample.label(), Some(1.0));
        assert_eq!(Sample::new(vec![0.0], vec![]).label(), None);
    }

    #[test]
    fn test_sample_from_tuple() {
        let sample: Sample = (vec![0.5], vec![0.0]).into();
        assert_eq!(sample.inputs, vec![0.5]);
        assert_eq!(sample.targets, vec![0.0]);
    }

    #[test]
    fn test_execution_mode_serde() -> Result<(), serde_json::Error> {
        assert_eq!(ExecutionMode::default(), ExecutionMode::Parallel);
        assert_eq!(serde_json::to_string(&ExecutionMode::Sequential)?, r#""Sequential""#);
        let mode: ExecutionMode = serde_json::from_str(r#""Synchronized""#)?;
        assert_eq!(mode, ExecutionMode::Synchronized);
        assert!(!mode.is_sequential());
        Ok(())
    }
}
