//! Configuration errors
//!
//! These are the only failures the middleware raises itself. They surface
//! synchronously from dispatch, before any notification is emitted. Failures
//! of the operation are data (the `error` field of the error notification)
//! and never appear here.

use thiserror::Error;

use crate::action::Stage;

/// Result alias for fallible middleware calls.
pub type Result<T> = std::result::Result<T, ConfigurationError>;

/// An action or configuration the middleware cannot process.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// A triple-or-mapping field has some other shape.
    #[error("{field} must be a [start, success, error] list or a mapping, got {found}")]
    InvalidShape {
        /// Field name as configured.
        field: String,
        /// Kind of value found instead.
        found: &'static str,
    },

    /// An entry of a triple-or-mapping field has the wrong kind.
    #[error("{field}.{stage} must be {expected}, got {found}")]
    InvalidEntry {
        /// Field name as configured.
        field: String,
        /// Stage the entry belongs to.
        stage: Stage,
        /// What the entry should have been.
        expected: &'static str,
        /// Kind of value found instead.
        found: &'static str,
    },

    /// Neither a literal `type` nor the types field is present.
    #[error("you must provide a type or {types_field} field")]
    MissingType {
        /// Types field name as configured.
        types_field: String,
    },

    /// The literal `type` field is present but not a string.
    #[error("type must be a string, got {found}")]
    InvalidType {
        /// Kind of value found instead.
        found: &'static str,
    },

    /// An operation or function field holds something that cannot be called.
    #[error("{field} must be {expected}, got {found}")]
    NotCallable {
        /// Field name as configured.
        field: String,
        /// What the field should have held.
        expected: &'static str,
        /// Kind of value found instead.
        found: &'static str,
    },

    /// Neither the operation nor the function field is present.
    #[error("action carries neither {operation_field} nor {function_field}")]
    NothingToRun {
        /// Operation field name as configured.
        operation_field: String,
        /// Function field name as configured.
        function_field: String,
    },

    /// A regular-expression matcher failed to compile.
    #[error("invalid hook pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// A configuration document could not be read.
    #[error("invalid configuration document: {0}")]
    Document(#[from] serde_json::Error),
}
