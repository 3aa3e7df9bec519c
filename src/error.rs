//! Resolver error taxonomy
//!
//! Every pipeline failure is one of four kinds. Authorization and not-found
//! failures short-circuit immediately with a single error; validation
//! failures are collected across mutation stages and reported together by
//! the executor. Persistence failures are surfaced verbatim and never
//! retried here.

use std::fmt;
use thiserror::Error;

use crate::storage::StoreError;

/// A single named validation failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn join_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(FieldError::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Failure of a resolver pipeline
#[derive(Debug, Error)]
pub enum ResolverError {
    /// Permission gate denial; surfaced verbatim
    #[error("not authorized to perform {operation}")]
    Unauthorized { operation: &'static str },

    /// One or more named field failures, all reported together
    #[error("validation failed: {}", join_fields(.errors))]
    Validation { errors: Vec<FieldError> },

    /// Anchor record absent where the operation requires one
    #[error("{what} not found")]
    NotFound { what: String },

    /// Storage failure, including uniqueness violations
    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),
}

impl ResolverError {
    pub fn not_found(what: impl Into<String>) -> Self {
        ResolverError::NotFound { what: what.into() }
    }

    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        ResolverError::Validation {
            errors: vec![FieldError::new(field, message)],
        }
    }

    /// Stable machine-readable kind for structured output
    pub fn kind(&self) -> &'static str {
        match self {
            ResolverError::Unauthorized { .. } => "authorization",
            ResolverError::Validation { .. } => "validation",
            ResolverError::NotFound { .. } => "not_found",
            ResolverError::Persistence(_) => "persistence",
        }
    }

    /// All messages carried by this error
    pub fn messages(&self) -> Vec<String> {
        match self {
            ResolverError::Validation { errors } => {
                errors.iter().map(FieldError::to_string).collect()
            }
            other => vec![other.to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_reports_every_field() {
        let err = ResolverError::Validation {
            errors: vec![
                FieldError::new("slug", "already in use"),
                FieldError::new("title", "must not be empty"),
            ],
        };

        assert_eq!(err.kind(), "validation");
        assert_eq!(err.messages().len(), 2);
        let text = err.to_string();
        assert!(text.contains("slug: already in use"));
        assert!(text.contains("title: must not be empty"));
    }

    #[test]
    fn kinds_are_stable() {
        assert_eq!(
            ResolverError::Unauthorized { operation: "updatePost" }.kind(),
            "authorization"
        );
        assert_eq!(ResolverError::not_found("post").kind(), "not_found");
    }
}
