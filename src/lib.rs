// KPiX Calibration Core - detector calibration and charge reconstruction
// Per-channel calibration constants built from raw sample streams or
// persisted calibration documents, consumed to convert raw ADC samples
// into physical charge.

// Module declarations
pub mod config;
pub mod document;
pub mod error;
pub mod fit;
pub mod reconstruct;
pub mod run;
pub mod sample;
pub mod stats;
pub mod store;

// Re-exports for convenience
pub use reconstruct::ChargeReconstructor;
pub use store::{CalibrationKey, CalibrationRecord, CalibrationStore};
