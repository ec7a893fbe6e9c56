//! Fatal error types for the binary crate: configuration and I/O
//! failures, the only two kinds §7 of the core specification calls
//! fatal. Per-satellite and per-epoch quality issues never surface here;
//! they are carried in-band via `Valid`/`RejectionCause`/`Flag` by the
//! engine crate.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration parameter {key}")]
    MissingParameter { key: &'static str },

    #[error("configuration parameter {key} expects {expected} value(s), got {got}")]
    WrongArity { key: &'static str, expected: usize, got: usize },

    #[error("configuration parameter {key} value {value} out of range: {reason}")]
    OutOfRange { key: &'static str, value: f64, reason: &'static str },

    #[error("configuration parameter {key} has unrecognized value {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("could not parse number for {key}: {source}")]
    ParseFloat { key: &'static str, #[source] source: std::num::ParseFloatError },

    #[error("could not parse date for {key}: {0}")]
    InvalidDate(String),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("reading {path:?}: {source}")]
    Io { path: PathBuf, #[source] source: std::io::Error },

    #[error("configuration error in {path:?}: {source}")]
    Config { path: PathBuf, #[source] source: ConfigError },

    #[error("malformed record in {path:?} at line {line}: {reason}")]
    MalformedRecord { path: PathBuf, line: usize, reason: String },

    #[error(transparent)]
    Engine(#[from] leoppp_engine::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
