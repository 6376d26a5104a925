//! Error types for attacks, sweeps and the collaborators they load.
use crate::PgdFloat;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PgdError>;

#[derive(Error, Debug)]
pub enum PgdError {
    /// A tensor did not have the length an operation expects
    #[error("Shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    /// An image handed to an attack has a pixel outside the valid range, or NaN
    #[error("Pixel {index} = {value} outside valid range [{min}, {max}]")]
    PixelOutOfRange {
        index: usize,
        value: PgdFloat,
        min: PgdFloat,
        max: PgdFloat,
    },

    #[error("Label {label} out of range for {num_classes} classes")]
    LabelOutOfRange { label: usize, num_classes: usize },

    /// An attack or sweep parameter failed validation
    #[error("Invalid parameter `{name}` = {value}: {constraint}")]
    InvalidParameter {
        name: &'static str,
        value: String,
        constraint: &'static str,
    },

    #[error("Invalid network: {0}")]
    InvalidNetwork(String),

    #[error("Dataset is empty")]
    EmptyDataset,

    #[error("Dataset has no sample at index {0}")]
    MissingSample(usize),

    #[error("Malformed IDX data: {0}")]
    MalformedIdx(String),

    #[error("Prediction undefined: {0}")]
    Prediction(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

impl PgdError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid(name: &'static str, value: impl ToString, constraint: &'static str) -> Self {
        Self::InvalidParameter {
            name,
            value: value.to_string(),
            constraint,
        }
    }
}

impl From<ndarray::ShapeError> for PgdError {
    fn from(e: ndarray::ShapeError) -> Self {
        PgdError::InvalidNetwork(e.to_string())
    }
}

impl From<ndarray_stats::errors::MinMaxError> for PgdError {
    fn from(e: ndarray_stats::errors::MinMaxError) -> Self {
        PgdError::Prediction(e.to_string())
    }
}
