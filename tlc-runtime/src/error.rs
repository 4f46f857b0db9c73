//! Error types

use std::fmt;

/// Errors that originate when reading serialized data
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum ReadError {
    /// The leading combinator number did not match any known combinator.
    UnknownDiscriminant { number: u32 },
    /// The end of the data was reached before a field was fully read.
    TruncatedStream { offset: usize, needed: usize },
    /// A string or byte sequence started with the reserved `0xFF` prefix.
    InvalidLengthPrefix { offset: usize },
    /// A `String` payload was not valid UTF-8.
    InvalidUtf8 { offset: usize },
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadError::UnknownDiscriminant { number } => {
                write!(f, "unknown combinator number `{number:#010x}`")
            }
            ReadError::TruncatedStream { offset, needed } => write!(
                f,
                "end of data reached unexpectedly (needed {needed} more bytes at offset {offset})"
            ),
            ReadError::InvalidLengthPrefix { offset } => {
                write!(f, "invalid length prefix at offset {offset}")
            }
            ReadError::InvalidUtf8 { offset } => {
                write!(f, "string at offset {offset} is not valid UTF-8")
            }
        }
    }
}

impl std::error::Error for ReadError {}

/// Errors that originate when serializing data
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum WriteError {
    /// A string or byte sequence does not fit into a 3-byte length prefix.
    TooLong { len: usize },
    /// A multiplicity field's element count differs from its nat field.
    CountMismatch { expected: u32, found: usize },
    /// A vector has more elements than a 4-byte count can describe.
    CountOverflow { len: usize },
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteError::TooLong { len } => {
                write!(f, "byte length {len} exceeds the maximum of {}", crate::MAX_BYTES_LEN)
            }
            WriteError::CountMismatch { expected, found } => {
                write!(f, "expected {expected} elements, found {found}")
            }
            WriteError::CountOverflow { len } => {
                write!(f, "element count {len} does not fit in 32 bits")
            }
        }
    }
}

impl std::error::Error for WriteError {}
