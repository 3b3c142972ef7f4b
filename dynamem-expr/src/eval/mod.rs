//! Evaluators for the two expression dialects

pub mod condition;
pub mod env;
pub mod funcs;
pub mod update;

pub use condition::eval_condition;
pub use env::{resolve_attr_name, Environment};
pub use update::apply_update;

use thiserror::Error;

/// An expression-evaluation failure.
///
/// These surface as validation errors at the operation boundary; the
/// message carries the offending path, function, or type pair.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct EvalError {
    pub message: String,
}

impl EvalError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
