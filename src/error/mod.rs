// Error types for the calibration core
//
// This module defines custom error types for document and fitting operations,
// providing structured error handling with numeric error codes suitable for
// reporting across tool boundaries.

mod document;
mod fit;

pub use document::{log_document_error, DocumentError, DocumentErrorCodes};
pub use fit::{FitError, FitErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the analysis tools.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
