//! # Transport Error Types
//!
//! Every error here is recovered locally: the offending datagram is dropped
//! and the manager state is left untouched.

use thiserror::Error;

/// Errors raised while decoding or configuring the transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Datagram shorter than the fixed header.
    #[error("malformed packet: {len} bytes is smaller than the {header} byte header")]
    MalformedPacket {
        /// Bytes received.
        len: usize,
        /// Required header size.
        header: usize,
    },

    /// Declared payload length disagrees with the datagram length.
    #[error("size mismatch: header declares {declared} payload bytes, datagram carries {actual}")]
    SizeMismatch {
        /// `data_size` from the header.
        declared: usize,
        /// Payload bytes actually present.
        actual: usize,
    },

    /// Compressed payload could not be restored to its original size.
    #[error("decompression failed: {0}")]
    DecompressionFailed(String),

    /// Invalid configuration file or value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
