//! Error types for the fusion engine.
//!
//! This module defines the error taxonomy shared by every stage of the
//! pipeline: image decode failures (fatal for the invocation), processing
//! errors with stage context, invalid input, configuration problems, and
//! missing external dependencies. Candidates with malformed geometry are
//! deliberately *not* errors; geometry and filtering functions skip them,
//! since candidates come from multiple independently trusted producers.

use thiserror::Error;

/// Convenience alias for results produced by the fusion engine.
pub type FusionResult<T> = Result<T, FusionError>;

/// Identifies which stage of the pipeline an error occurred in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProcessingStage {
    /// Error occurred while preparing or interpreting tensors.
    TensorOperation,
    /// Error occurred while resizing or letterboxing an image.
    Resize,
    /// Error occurred in a classical detector.
    Heuristic,
    /// Error occurred while rendering the overlay.
    Rendering,
    /// Generic processing error.
    Generic,
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingStage::TensorOperation => write!(f, "tensor operation"),
            ProcessingStage::Resize => write!(f, "resize"),
            ProcessingStage::Heuristic => write!(f, "heuristic detection"),
            ProcessingStage::Rendering => write!(f, "rendering"),
            ProcessingStage::Generic => write!(f, "processing"),
        }
    }
}

/// Errors that can occur while analyzing an image.
///
/// A single analysis either completes or fails with one of these; partial
/// results are never surfaced as success.
#[derive(Error, Debug)]
pub enum FusionError {
    /// The source image bytes could not be decoded. Fatal for the
    /// invocation: there is no pixel data to act on.
    #[error("image decode")]
    ImageDecode(#[source] image::ImageError),

    /// The encoded source image exceeds the accepted size limit.
    #[error("image too large: {size} bytes exceeds limit of {limit}")]
    ImageTooLarge {
        /// Size of the rejected input in bytes.
        size: usize,
        /// The configured maximum in bytes.
        limit: usize,
    },

    /// Error occurred during processing.
    #[error("{kind} failed: {context}")]
    Processing {
        /// The stage of the pipeline where the error occurred.
        kind: ProcessingStage,
        /// Additional context about the error.
        context: String,
        /// The underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error indicating invalid input.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// A message describing the invalid input.
        message: String,
    },

    /// Error indicating a configuration problem.
    #[error("configuration: {message}")]
    Config {
        /// A message describing the configuration error.
        message: String,
    },

    /// A required external runtime (model session, font, ...) is not
    /// available in the execution environment. Raised eagerly, before any
    /// image processing begins.
    #[error("dependency unavailable: {name}")]
    DependencyUnavailable {
        /// The name of the missing dependency.
        name: String,
    },

    /// Error from tensor shape operations.
    #[error("tensor operation")]
    Tensor(#[from] ndarray::ShapeError),

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),
}

impl FusionError {
    /// Creates a processing error with stage context.
    pub fn processing(
        kind: ProcessingStage,
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            kind,
            context: context.to_string(),
            source: Box::new(error),
        }
    }

    /// Creates an error for invalid input.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a configuration error with field context.
    pub fn config_field(field: &str, value: impl std::fmt::Display, reason: &str) -> Self {
        Self::Config {
            message: format!("field '{field}' with value '{value}': {reason}"),
        }
    }

    /// Creates an error for a missing external dependency.
    pub fn dependency_unavailable(name: impl Into<String>) -> Self {
        Self::DependencyUnavailable { name: name.into() }
    }
}

impl From<image::ImageError> for FusionError {
    fn from(error: image::ImageError) -> Self {
        Self::ImageDecode(error)
    }
}
