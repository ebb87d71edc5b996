use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfSuiteError {
    #[error("Invalid document format: {0}")]
    InvalidFormat(String),

    #[error("Document is encrypted and requires a password")]
    PasswordRequired,

    #[error("Incorrect password")]
    WrongPassword,

    #[error("Document is unavailable for editing")]
    DocumentUnavailable,

    #[error("Selection does not contain any valid pages")]
    OutOfRangeSelection,

    #[error("Unsupported image asset: {0}")]
    UnsupportedAsset(String),

    #[error("Page has not been rendered yet")]
    NotRendered,

    #[error("Unsupported rotation: {0} degrees")]
    UnsupportedRotation(i64),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Another operation is already in progress")]
    Busy,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("PDF operation failed: {0}")]
    OperationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl PdfSuiteError {
    /// Password problems can be fixed by asking the user again.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::PasswordRequired | Self::WrongPassword)
    }
}

impl From<lopdf::Error> for PdfSuiteError {
    fn from(e: lopdf::Error) -> Self {
        PdfSuiteError::OperationError(e.to_string())
    }
}

impl From<serde_json::Error> for PdfSuiteError {
    fn from(e: serde_json::Error) -> Self {
        PdfSuiteError::SerializationError(e.to_string())
    }
}
