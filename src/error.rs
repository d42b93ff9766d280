use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Why a single input line could not become an observation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("separator {0:?} not found")]
    MissingSeparator(char),

    #[error("key is not valid UTF-8")]
    InvalidKey,

    #[error("value {0:?} is not a decimal number")]
    InvalidValue(String),

    #[error("value {0:?} is not finite")]
    NonFinite(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line_no}: {reason} ({line:?})")]
    Malformed {
        line_no: u64,
        line: String,
        reason: ParseError,
    },

    #[error("{}:{line_no}: malformed summary line ({line:?})", path.display())]
    Summary {
        path: PathBuf,
        line_no: u64,
        line: String,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
