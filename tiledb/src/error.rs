use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the tile bit database. The database never recovers
/// internally; every failure carries enough context for the caller to act on.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("{}:{line}: {reason}", .path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        reason: String,
    },
    #[error("invalid configuration bit `{0}`")]
    BadBit(String),
    #[error("unknown mux {0}")]
    UnknownMux(String),
    #[error("unknown source {source} in mux {sink}")]
    UnknownMuxSource { sink: String, source: String },
    #[error("unknown word setting {0}")]
    UnknownWord(String),
    #[error("unknown enum setting {0}")]
    UnknownEnum(String),
    #[error("unknown option {option} in enum {name}")]
    UnknownEnumOption { name: String, option: String },
    #[error("ambiguous driver for mux {sink}: {sources:?}")]
    AmbiguousMuxDriver { sink: String, sources: Vec<String> },
    #[error("ambiguous value for enum {name}: {options:?}")]
    AmbiguousEnumValue { name: String, options: Vec<String> },
    #[error("word setting {name} is {expected} bits wide, got {got}")]
    WordSizeMismatch {
        name: String,
        expected: usize,
        got: usize,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
