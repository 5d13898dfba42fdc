// src/error.rs

use thiserror::Error;

/// Core error types for toolstrap
///
/// Every variant is fatal for the install run it occurs in; there are no
/// automatic retries anywhere in the pipeline.
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level download failure (connect, read, client build)
    #[error("Download error: {0}")]
    Download(String),

    /// The server answered, but not with a success status
    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    /// zstd decompression failure, carrying the codec diagnostic
    #[error("Decompression error: {0}")]
    Decompression(String),

    /// Malformed index text or container structure
    #[error("Format error: {0}")]
    Format(String),

    /// A tar entry declares more data than the buffer holds
    #[error("Truncated archive: entry '{name}' declares {declared} bytes but only {available} remain")]
    TruncatedArchive {
        name: String,
        declared: u64,
        available: u64,
    },

    /// Downloaded payload does not match the digest declared by the index
    #[error("Checksum mismatch for {filename}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        filename: String,
        expected: String,
        actual: String,
    },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using toolstrap's Error type
pub type Result<T> = std::result::Result<T, Error>;
