//! Error types for decoding, encoding and loading CHD maps.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChdError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input ended before a declared field or payload.
    #[error("unexpected end of input at offset {offset}: needed {needed} bytes, {available} available")]
    UnexpectedEof {
        offset: u64,
        needed: u64,
        available: u64,
    },

    /// A declared count or length cannot be represented in memory.
    #[error("length overflow in {field}: {value}")]
    LengthOverflow { field: &'static str, value: u64 },

    /// The decoded fields violate a structural invariant of the map.
    #[error("inconsistent map: {0}")]
    Inconsistent(String),

    /// Writing stopped at the first failure. `written` counts only fields
    /// the writer accepted in full; a field that was partially written is
    /// not included. Whatever reached the sink is not a valid map and must
    /// be discarded.
    #[error("write failed after {written} bytes: {source}")]
    Write {
        written: u64,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ChdError>;

impl From<ChdError> for io::Error {
    fn from(err: ChdError) -> Self {
        match err {
            ChdError::Io(e) => e,
            ChdError::Write { source, .. } => source,
            ChdError::UnexpectedEof { .. } => io::Error::new(io::ErrorKind::UnexpectedEof, err),
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
