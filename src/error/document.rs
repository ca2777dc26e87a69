// Calibration document error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Document error code constants
///
/// These constants provide a single source of truth for error codes
/// shared between the library and the analysis tools.
///
/// Error code range: 1001-1002
pub struct DocumentErrorCodes {}

impl DocumentErrorCodes {
    /// Calibration file could not be read or written
    pub const IO: i32 = 1001;

    /// Calibration file is not a well-formed document
    pub const MALFORMED: i32 = 1002;
}

/// Log a document error with structured context
///
/// Logs document errors with the numeric error code, the component name
/// and a human-readable message. Logging is non-blocking and will not
/// panic on failure.
pub fn log_document_error(err: &DocumentError, context: &str) {
    error!(
        "Document error in {}: code={}, component=CalibrationDocument, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Calibration document errors
///
/// These errors cover reading, writing and parsing of the calibration
/// XML document. A failed parse never leaves partial data behind: the
/// document is checked for well-formedness before any store mutation.
///
/// Error code range: 1001-1002
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentError {
    /// Calibration file could not be read or written
    Io { path: String, reason: String },

    /// Calibration file is not a well-formed document
    Malformed { reason: String },
}

impl ErrorCode for DocumentError {
    fn code(&self) -> i32 {
        match self {
            DocumentError::Io { .. } => DocumentErrorCodes::IO,
            DocumentError::Malformed { .. } => DocumentErrorCodes::MALFORMED,
        }
    }

    fn message(&self) -> String {
        match self {
            DocumentError::Io { path, reason } => {
                format!("Calibration file I/O failed for {}: {}", path, reason)
            }
            DocumentError::Malformed { reason } => {
                format!("Malformed calibration document: {}", reason)
            }
        }
    }
}

impl fmt::Display for DocumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentError (code {}): {}", self.code(), self.message())
    }
}

impl std::error::Error for DocumentError {}
