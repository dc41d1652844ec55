//! Error types with actionable diagnostics.
//!
//! Every variant carries enough context to act on the failure without
//! reading the source: which file, which tensor, which label.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for sentence-tune operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while fetching data, building models, training or
/// restoring checkpoints.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error with context.
    #[error("IO error: {context}\n  Cause: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Download failed or returned a non-success status.
    #[error("HTTP error: {message}\n  → Check network connectivity and the URL")]
    Http { message: String },

    /// A dataset row carried a label outside the known label set.
    #[error("Unknown label '{label}' in {path}\n  → Known labels: {known}")]
    UnknownLabel { label: String, path: PathBuf, known: String },

    /// A required TSV column is missing from the header.
    #[error("Column '{column}' missing from header of {path}")]
    MissingColumn { column: String, path: PathBuf },

    /// A field could not be parsed.
    #[error("Parse error in {path} at line {line}: {message}")]
    Parse { path: PathBuf, line: usize, message: String },

    /// Tensor shape mismatch between saved state and the live model.
    #[error("Tensor shape mismatch for {tensor}: expected {expected:?}, got {actual:?}\n  → The checkpoint was written for a different architecture")]
    ShapeMismatch { tensor: String, expected: Vec<usize>, actual: Vec<usize> },

    /// Saved state names a parameter the live model does not have, or the reverse.
    #[error("State key mismatch: {message}\n  → Rebuild the loss head with the same label count used at save time")]
    StateKeyMismatch { message: String },

    /// Serialization/deserialization error.
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Configuration value is invalid.
    #[error("Invalid configuration value for '{field}': {message}")]
    Config { field: String, message: String },

    /// Stored tensor has a dtype this crate cannot load.
    #[error("Unsupported dtype {dtype} for tensor {tensor}\n  → Only F32 weights are supported")]
    UnsupportedDtype { tensor: String, dtype: String },

    /// Model bundle or pretrained weights not found.
    #[error("Model not found: {path}\n  → Save a model there first or check the path")]
    ModelNotFound { path: PathBuf },

    /// An operation required at least one example.
    #[error("Empty dataset: {context}")]
    EmptyDataset { context: String },
}

impl Error {
    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io { context: context.into(), source }
    }

    /// Create a serialization error from anything displayable.
    pub fn serialization(message: impl std::fmt::Display) -> Self {
        Self::Serialization { message: message.to_string() }
    }

    /// Get the error code for structured output.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io { .. } => "E050",
            Self::Http { .. } => "E020",
            Self::UnknownLabel { .. } => "E100",
            Self::MissingColumn { .. } => "E101",
            Self::Parse { .. } => "E102",
            Self::ShapeMismatch { .. } => "E040",
            Self::StateKeyMismatch { .. } => "E041",
            Self::Serialization { .. } => "E051",
            Self::Config { .. } => "E003",
            Self::UnsupportedDtype { .. } => "E011",
            Self::ModelNotFound { .. } => "E010",
            Self::EmptyDataset { .. } => "E110",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::serialization(format!("JSON: {e}"))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Self::serialization(format!("YAML: {e}"))
    }
}

impl From<safetensors::SafeTensorError> for Error {
    fn from(e: safetensors::SafeTensorError) -> Self {
        Self::serialization(format!("SafeTensors: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_unique() {
        let errors = vec![
            Error::io("x", std::io::Error::other("boom")),
            Error::Http { message: String::new() },
            Error::UnknownLabel { label: String::new(), path: "".into(), known: String::new() },
            Error::MissingColumn { column: String::new(), path: "".into() },
            Error::Parse { path: "".into(), line: 0, message: String::new() },
            Error::ShapeMismatch { tensor: String::new(), expected: vec![], actual: vec![] },
            Error::StateKeyMismatch { message: String::new() },
            Error::serialization(""),
            Error::Config { field: String::new(), message: String::new() },
            Error::UnsupportedDtype { tensor: String::new(), dtype: String::new() },
            Error::ModelNotFound { path: "".into() },
            Error::EmptyDataset { context: String::new() },
        ];
        let mut codes: Vec<_> = errors.iter().map(Error::code).collect();
        let total = codes.len();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), total);
    }

    #[test]
    fn test_shape_mismatch_message_names_tensor() {
        let err = Error::ShapeMismatch {
            tensor: "classifier.weight".into(),
            expected: vec![3, 96],
            actual: vec![2, 96],
        };
        let msg = err.to_string();
        assert!(msg.contains("classifier.weight"));
        assert!(msg.contains("[3, 96]"));
    }

    #[test]
    fn test_io_error_keeps_source() {
        use std::error::Error as _;
        let err = Error::io("reading vocab", std::io::Error::other("denied"));
        assert!(err.source().is_some());
        assert!(err.to_string().contains("reading vocab"));
    }
}
