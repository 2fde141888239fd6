use std::io;
use thiserror::Error;

//===========================================================================//

/// The error type for every fallible operation in this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// A container header is missing, inconsistent, or has a bad signature.
    #[error("malformed header: {0}")]
    MalformedHeader(String),
    /// A header size, compression kind, or bit depth that isn't supported.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
    /// The input ended in the middle of a header, palette, row or record.
    #[error("truncated input: {0}")]
    TruncatedInput(String),
    /// A width or height was zero, negative, or too large to address.
    #[error("invalid dimensions: {0}")]
    DimensionError(String),
    /// A value doesn't fit in the container's fixed-size fields.
    #[error("capacity exceeded: {0}")]
    CapacityExceeded(String),
    /// An options value is out of range or couldn't be parsed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The underlying reader or writer failed.
    #[error("I/O failure: {0}")]
    Io(#[source] io::Error),
}

impl Error {
    /// Returns the category of this error, without its message.
    pub fn kind(&self) -> ErrorKind {
        match *self {
            Error::MalformedHeader(_) => ErrorKind::MalformedHeader,
            Error::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            Error::TruncatedInput(_) => ErrorKind::TruncatedInput,
            Error::DimensionError(_) => ErrorKind::DimensionError,
            Error::CapacityExceeded(_) => ErrorKind::CapacityExceeded,
            Error::InvalidConfig(_) => ErrorKind::InvalidConfig,
            Error::Io(_) => ErrorKind::Io,
        }
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Error {
        // byteorder and read_exact report a short stream as UnexpectedEof.
        if error.kind() == io::ErrorKind::UnexpectedEof {
            Error::TruncatedInput(error.to_string())
        } else {
            Error::Io(error)
        }
    }
}

//===========================================================================//

/// The category of an [`Error`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorKind {
    /// See [`Error::MalformedHeader`].
    MalformedHeader,
    /// See [`Error::UnsupportedFormat`].
    UnsupportedFormat,
    /// See [`Error::TruncatedInput`].
    TruncatedInput,
    /// See [`Error::DimensionError`].
    DimensionError,
    /// See [`Error::CapacityExceeded`].
    CapacityExceeded,
    /// See [`Error::InvalidConfig`].
    InvalidConfig,
    /// See [`Error::Io`].
    Io,
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

//===========================================================================//


//===========================================================================//
