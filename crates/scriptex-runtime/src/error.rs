use std::{io, path::PathBuf};

use rhai::{EvalAltResult, INT};
use thiserror::Error;

/// Failure to locate, verify or compile the isolated script library.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Library resource `{0}` not found")]
    MissingResource(String),
    #[error("Unable to read library resource {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Invalid manifest entry on line {line}: `{content}`")]
    InvalidManifest { line: usize, content: String },
    #[error("Checksum mismatch for `{file}`, expected {expected}, got {actual}")]
    ChecksumMismatch {
        file: String,
        expected: String,
        actual: String,
    },
    #[error("Failed to compile library module `{file}`: {message}")]
    Compile { file: String, message: String },
}

#[derive(Debug, Error)]
pub enum ContextCreationError {
    #[error("Failed to instantiate library module `{module}`: {message}")]
    Library { module: String, message: String },
}

#[derive(Debug, Error, PartialEq)]
pub enum ExecutionError {
    #[error("Index {index} out of bounds for length {length}")]
    IndexOutOfBounds { length: usize, index: INT },
    #[error("{0}")]
    Script(String),
}

impl From<Box<EvalAltResult>> for ExecutionError {
    fn from(err: Box<EvalAltResult>) -> Self {
        match innermost(&err) {
            EvalAltResult::ErrorArrayBounds(length, index, _) => ExecutionError::IndexOutOfBounds {
                length: *length,
                index: *index,
            },
            _ => ExecutionError::Script(err.to_string()),
        }
    }
}

fn innermost(err: &EvalAltResult) -> &EvalAltResult {
    match err {
        EvalAltResult::ErrorInFunctionCall(_, _, inner, _) | EvalAltResult::ErrorInModule(_, inner, _) => {
            innermost(inner)
        }
        other => other,
    }
}
