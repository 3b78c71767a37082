//! Error types for mobiview operations.

use thiserror::Error;

/// Errors that can occur while building or assembling a preview document.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid query expression: {0}")]
    Query(String),

    #[error("index {index} out of bounds for result of {len} nodes")]
    Index { index: usize, len: usize },

    #[error("operation not permitted for this node kind")]
    InvalidNode,

    #[error("no part at index {0}")]
    PartNotFound(usize),
}

pub type Result<T> = std::result::Result<T, Error>;
