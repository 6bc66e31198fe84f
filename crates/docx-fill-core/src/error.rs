//! Error types for the fill engine.

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// The bytes are not a readable `.docx` package.
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    /// The extraction reply did not contain a usable placeholder list.
    #[error("Extraction protocol error: {0}")]
    ExtractionProtocol(String),

    /// The document was built in memory and has no package to write back into.
    #[error("Document has no package to serialize into")]
    DetachedDocument,

    #[error("Invalid placeholder pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Error::MalformedDocument(err.to_string())
    }
}

impl From<roxmltree::Error> for Error {
    fn from(err: roxmltree::Error) -> Self {
        Error::MalformedDocument(format!("XML: {}", err))
    }
}
