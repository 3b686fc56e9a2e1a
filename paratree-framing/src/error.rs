use thiserror::Error;

/// The Error type for the framing layer.
///
/// It can represent any kind of error the framed-buffer and registry
/// machinery might encounter.
#[derive(Error, Debug)]
pub enum Error {
    /// A read was attempted past the buffer's written size.
    #[error("decode overrun: tried to read {requested} byte(s) at position {pos}, but only {written} byte(s) were written")]
    DecodeOverrun {
        /// The read cursor's position at the time of the failed read.
        pos: usize,
        /// The number of bytes the read attempted to consume.
        requested: usize,
        /// The total number of bytes written to the buffer.
        written: usize,
    },
    /// A length prefix decoded to a negative or implausible size.
    #[error("size mismatch: decoded a negative or out-of-range length prefix ({0})")]
    SizeMismatch(i32),
    /// A buffer's type tag is not registered in the knowledge registry.
    #[error("unknown type: no prototype registered for type tag '{0}'")]
    UnknownType(String),
    /// A string or UTF-8 byte sequence could not be decoded.
    #[error("invalid UTF-8 in framed string: {0}")]
    Utf8Error(#[from] std::string::FromUtf8Error),
    /// An I/O error surfaced from the underlying byte cursor.
    #[error("IO error: {0}")]
    IOError(#[from] std::io::Error),
}
