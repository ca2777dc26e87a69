//! Analysis run configuration
//!
//! This module provides configuration loading from JSON files for the
//! offline calibration tools: device polarity and gain flags read once
//! per analysis run, the injection-time windows for sample gating, and
//! the noise floor below which a fitted gain is not trusted.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Complete analysis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub device: DeviceConfig,
    pub fitting: FittingConfig,
}

/// Device configuration flags, read once per analysis run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Injection polarity: charge measured down from 2.5 V when true
    pub positive_polarity: bool,
    /// 22x injection capacitance on bucket 0 during calibration
    pub b0_calib_high: bool,
    /// Front end pinned to the low gain range
    pub force_low_gain: bool,
    /// Doubled front-end gain
    pub double_gain: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            positive_polarity: true,
            b0_calib_high: false,
            force_low_gain: false,
            double_gain: false,
        }
    }
}

/// Fitting and validity-gating parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittingConfig {
    /// Minimum gain magnitude for a calibration to be trusted (ADC/C)
    pub min_gain: f64,
    /// Cumulative injection-time boundaries per bucket; None disables
    /// time gating
    pub inject_windows: Option<[u32; 5]>,
}

impl Default for FittingConfig {
    fn default() -> Self {
        Self {
            // Gains below the noise floor cannot separate signal from
            // pedestal fluctuations
            min_gain: 3e-15,
            inject_windows: None,
        }
    }
}

impl Default for AnalysisConfig {
    /// Default configuration values (fallback if config file not found)
    fn default() -> Self {
        Self {
            device: DeviceConfig::default(),
            fitting: FittingConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from JSON file
    ///
    /// Falls back to defaults when the file is missing or does not parse,
    /// logging a warning either way.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }
}
