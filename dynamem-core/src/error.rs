//! Error taxonomy for dynamem operations

use crate::Item;
use thiserror::Error;

/// Errors surfaced by the public operation surface.
///
/// Expression-level failures map to `Validation` at the operation
/// boundary unless they are one of the two recognised parse failures
/// (`Syntax`, `Unsupported`). `InternalServer` and `ThroughputExceeded`
/// are produced only by failure injection and are recoverable in batch
/// contexts.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DynamemError {
    #[error("Resource not found: {name}")]
    ResourceNotFound { name: String },

    #[error("Resource in use: {name}")]
    ResourceInUse { name: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("The conditional request failed")]
    ConditionalCheckFailed {
        message: String,
        /// Pre-image of the item, attached when the caller requests it.
        old_item: Option<Item>,
    },

    #[error("Syntax error in expression: {message}")]
    Syntax { message: String },

    #[error("Unsupported feature: {message}")]
    Unsupported { message: String },

    #[error("Internal server error")]
    InternalServer,

    #[error("Provisioned throughput exceeded")]
    ThroughputExceeded,

    /// Test sentinel for the deprecated forced-failure mode.
    #[error("Forced failure")]
    ForcedFailure,
}

impl DynamemError {
    pub fn validation(message: impl Into<String>) -> Self {
        DynamemError::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(name: impl Into<String>) -> Self {
        DynamemError::ResourceNotFound { name: name.into() }
    }

    /// True for the error kinds a batch converts into unprocessed entries.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DynamemError::InternalServer | DynamemError::ThroughputExceeded
        )
    }
}

/// Result type alias for dynamem operations.
pub type DynamemResult<T> = Result<T, DynamemError>;
