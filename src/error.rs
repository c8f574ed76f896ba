//! Error taxonomy for the compiler front-end.
//!
//! Every fallible library operation returns [`GenError`]. The CLI layer wraps these
//! in `anyhow` for reporting; library callers can match on the variants.

use crate::spec::ValidationIssue;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T, E = GenError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum GenError {
    /// The spec (or a remote document it references) could not be fetched or read.
    #[error("unable to reach spec at {location}: {reason}")]
    UnreachableSpec { location: String, reason: String },

    /// The document is neither valid JSON nor valid YAML, or does not fit the Swagger 2.0 shape.
    #[error("unable to parse spec at {location}: {reason}")]
    ParseSpec { location: String, reason: String },

    /// Structural validation failed. Carries every error found, not just the first.
    #[error("{}", format_invalid(.location, .errors))]
    InvalidSpec {
        location: String,
        errors: Vec<ValidationIssue>,
    },

    #[error("broken reference {reference} (referenced from {referrer})")]
    BrokenReference { reference: String, referrer: String },

    #[error("malformed x-external-type at {location}: {reason}")]
    MalformedOverride { location: String, reason: String },

    #[error("unknown operations: {}", .names.join(", "))]
    UnknownOperation { names: Vec<String> },

    #[error("unknown models: {}", .names.join(", "))]
    UnknownDefinition { names: Vec<String> },

    #[error("flattening failed at {location}: {reason}")]
    Flatten { location: String, reason: String },

    #[error("failed to build model for definition {name}: {source}")]
    Definition {
        name: String,
        source: Box<GenError>,
    },

    #[error("failed to build model for operation {name}: {source}")]
    Operation {
        name: String,
        source: Box<GenError>,
    },
}

impl GenError {
    pub(crate) fn in_definition(name: &str, source: GenError) -> Self {
        GenError::Definition {
            name: name.to_string(),
            source: Box::new(source),
        }
    }

    pub(crate) fn in_operation(name: &str, source: GenError) -> Self {
        GenError::Operation {
            name: name.to_string(),
            source: Box::new(source),
        }
    }

    /// Innermost error, skipping the definition/operation context wrappers
    pub fn root_cause(&self) -> &GenError {
        match self {
            GenError::Definition { source, .. } | GenError::Operation { source, .. } => {
                source.root_cause()
            }
            other => other,
        }
    }
}

fn format_invalid(location: &str, errors: &[ValidationIssue]) -> String {
    let mut out = format!(
        "spec at {location} is invalid ({} error(s)):",
        errors.len()
    );
    for issue in errors {
        out.push_str("\n  - ");
        out.push_str(&issue.to_string());
    }
    out
}
