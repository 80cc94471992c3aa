use std::{io, path::PathBuf};

use scriptex_runtime::ContextCreationError;
use thiserror::Error;

/// A cache policy string that is neither `STATIC` nor `<integer> <unit>`.
#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("The text '{0}' is not a valid time configuration")]
    Malformed(String),
    #[error("Invalid cache duration '{0}'")]
    InvalidDuration(String),
    #[error("Unknown time unit '{0}'")]
    UnknownUnit(String),
    #[error("Cache duration '{0}' is too large")]
    DurationOverflow(String),
}

#[derive(Debug, Error)]
pub enum DataError {
    #[error("Unable to access script data file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Malformed script data file {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("Value cannot be stored: {0}")]
    Conversion(String),
}

#[derive(Debug, Error, PartialEq, Clone)]
#[error("Placeholder substitution failed: {0}")]
pub struct SubstitutionError(pub String);

/// Why a single evaluation failed. Callers of
/// [`Evaluator::evaluate`](crate::Evaluator::evaluate) only ever see the
/// fixed error string.
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("Argument out of bound while executing script '{script}': {message}")]
    Argument { script: String, message: String },
    #[error("An error occurred while executing the script '{script}': {message}")]
    ScriptExecution { script: String, message: String },
    #[error(transparent)]
    ContextCreation(#[from] ContextCreationError),
    #[error(transparent)]
    Substitution(#[from] SubstitutionError),
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Unable to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Malformed script configuration {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}
