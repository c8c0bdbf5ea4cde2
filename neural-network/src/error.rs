use thiserror::Error;

/// Errors raised while building or running a [`Network`](crate::Network).
#[derive(Debug, Error)]
pub enum NetworkError {
    /// The requested layer layout cannot form a network
    #[error("Invalid architecture: {0}")]
    InvalidArchitecture(String),
    /// An input vector was missing or unusable
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// A vector's width disagrees with the network's configured width
    #[error("Data shape mismatch{}: {field} has {actual} values, expected {expected}", .index.map(|i| format!(" in sample {i}")).unwrap_or_default())]
    DataShapeMismatch {
        index: Option<usize>,
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    /// Wrapper for standard I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// A configuration file could not be parsed
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}

impl NetworkError {
    pub(crate) fn shape(field: &'static str, expected: usize, actual: usize) -> Self {
        NetworkError::DataShapeMismatch {
            index: None,
            field,
            expected,
            actual,
        }
    }

    /// Attaches the position of the offending sample to a shape mismatch.
    #[must_use]
    pub fn at_sample(self, sample: usize) -> Self {
        match self {
            NetworkError::DataShapeMismatch {
                field,
                expected,
                actual,
                ..
            } => NetworkError::DataShapeMismatch {
                index: Some(sample),
                field,
                expected,
                actual,
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_message() {
        let err = NetworkError::shape("inputs", 15, 14);
        assert_eq!(
            err.to_string(),
            "Data shape mismatch: inputs has 14 values, expected 15"
        );
        let err = err.at_sample(3);
        assert_eq!(
            err.to_string(),
            "Data shape mismatch in sample 3: inputs has 14 values, expected 15"
        );
    }

    #[test]
    fn test_at_sample_keeps_other_errors() {
        let err = NetworkError::InvalidInput("empty".into()).at_sample(2);
        assert!(matches!(err, NetworkError::InvalidInput(_)));
    }
}
