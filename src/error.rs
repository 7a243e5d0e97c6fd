//! Error types
//!
//! Only genuinely unrecoverable conditions surface as errors: corrupted
//! persisted baselines, missing baselines in strict test mode, storage
//! failures and malformed path expressions. Lookup misses and ordering
//! violations are results, reported through `CheckReport`.

use std::path::PathBuf;

use thiserror::Error;

/// A path expression that could not be compiled
#[derive(Debug, Error)]
#[error("invalid path expression: {message}")]
pub struct QueryError {
    message: String,
}

impl QueryError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        QueryError {
            message: message.into(),
        }
    }
}

/// Errors produced by baseline loading, checking and persistence
#[derive(Debug, Error)]
pub enum Error {
    /// A persisted baseline line could not be placed in the tree
    #[error("malformed baseline at line {line}: {detail}")]
    MalformedBaseline { line: usize, detail: String },

    /// Strict test mode requires a previously-derived baseline
    #[error("no baseline stored for identity {identity}")]
    MissingBaseline { identity: String },

    /// Reading or writing a baseline or snapshot file failed
    #[error("storage failure at {path}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_name_the_context() {
        let err = Error::MalformedBaseline {
            line: 4,
            detail: "indentation jumps two levels".into(),
        };
        assert!(err.to_string().contains("line 4"));

        let err = QueryError::new("empty expression");
        assert!(err.to_string().contains("empty expression"));
    }
}
