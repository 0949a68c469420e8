//! Error types for the smart calculator pipeline
//!
//! These errors cover the failures that stop a culture from initializing or a pass
//! from completing. Per-line semantic failures (incompatible units, unsupported
//! operators) are not errors at this level: they travel as
//! [`OperationError`](smart_calc_support::OperationError) values inside the result data.

use std::fmt;

/// Result type alias for pipeline operations
pub type CalcResult<T> = Result<T, CalcError>;

/// Error types for pipeline operations
#[derive(Debug)]
pub enum CalcError {
    /// A grammar, unit or function table is missing or corrupt for a culture
    ResourceLoad {
        culture: String,
        resource: String,
        reason: String,
    },

    /// The statement before/after constraints contain a cycle
    CyclicStatementOrder(Vec<String>),

    /// The evaluation pass was cancelled before completion
    Cancelled,

    /// A session was created outside of a Tokio runtime
    NoRuntime,

    /// IO error (file operations, etc.)
    IoError(std::io::Error),

    /// JSON serialization/deserialization error
    JsonError(serde_json::Error),

    /// Invalid input parameters
    InvalidInput(String),
}

impl CalcError {
    pub fn resource_load(
        culture: impl Into<String>,
        resource: impl Into<String>,
        reason: impl fmt::Display,
    ) -> Self {
        CalcError::ResourceLoad {
            culture: culture.into(),
            resource: resource.into(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for CalcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalcError::ResourceLoad {
                culture,
                resource,
                reason,
            } => write!(
                f,
                "Failed to load {} resource for culture '{}': {}",
                resource, culture, reason
            ),
            CalcError::CyclicStatementOrder(names) => {
                write!(f, "Cyclic statement order between: {}", names.join(", "))
            }
            CalcError::Cancelled => write!(f, "Evaluation cancelled"),
            CalcError::NoRuntime => write!(f, "No Tokio runtime available"),
            CalcError::IoError(err) => write!(f, "IO error: {}", err),
            CalcError::JsonError(err) => write!(f, "JSON error: {}", err),
            CalcError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
        }
    }
}

impl std::error::Error for CalcError {}

impl From<std::io::Error> for CalcError {
    fn from(err: std::io::Error) -> Self {
        CalcError::IoError(err)
    }
}

impl From<serde_json::Error> for CalcError {
    fn from(err: serde_json::Error) -> Self {
        CalcError::JsonError(err)
    }
}
