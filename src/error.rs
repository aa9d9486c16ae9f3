//! Error types for the gridworld crate

use thiserror::Error;

use crate::environment::Pos;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("{what} at {pos} lies outside the {width}x{height} grid")]
    OutOfBounds {
        what: &'static str,
        pos: Pos,
        width: usize,
        height: usize,
    },

    #[error("{what} at {pos} is placed on a barrier")]
    OnBarrier { what: &'static str, pos: Pos },

    #[error("failed to {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Error::InvalidConfiguration {
            message: message.into(),
        }
    }
}
