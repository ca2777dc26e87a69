// Curve fitting error types and constants

use crate::error::ErrorCode;
use std::fmt;

/// Fit error code constants
///
/// Error code range: 2001-2003
pub struct FitErrorCodes {}

impl FitErrorCodes {
    /// Baseline histogram has no entries in the fit window
    pub const EMPTY_HISTOGRAM: i32 = 2001;

    /// Too few calibration points for a line fit
    pub const INSUFFICIENT_POINTS: i32 = 2002;

    /// Fit inputs are numerically degenerate
    pub const DEGENERATE: i32 = 2003;
}

/// Curve fitting errors
///
/// A fit failure is not fatal to the calibration pass: the affected
/// record fields are left at zero, which downstream reconstruction
/// treats as "no calibration available" (raw pass-through).
///
/// Error code range: 2001-2003
#[derive(Debug, Clone, PartialEq)]
pub enum FitError {
    /// Baseline histogram has no entries in the fit window
    EmptyHistogram,

    /// Too few calibration points for a line fit
    InsufficientPoints { required: usize, collected: usize },

    /// Fit inputs are numerically degenerate
    Degenerate { reason: String },
}

impl ErrorCode for FitError {
    fn code(&self) -> i32 {
        match self {
            FitError::EmptyHistogram => FitErrorCodes::EMPTY_HISTOGRAM,
            FitError::InsufficientPoints { .. } => FitErrorCodes::INSUFFICIENT_POINTS,
            FitError::Degenerate { .. } => FitErrorCodes::DEGENERATE,
        }
    }

    fn message(&self) -> String {
        match self {
            FitError::EmptyHistogram => "Baseline histogram is empty".to_string(),
            FitError::InsufficientPoints {
                required,
                collected,
            } => {
                format!(
                    "Insufficient fit points: need {}, got {}",
                    required, collected
                )
            }
            FitError::Degenerate { reason } => format!("Degenerate fit: {}", reason),
        }
    }
}

impl fmt::Display for FitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FitError (code {}): {}", self.code(), self.message())
    }
}

impl std::error::Error for FitError {}
