// Curve fitting - reduction of accumulated statistics into constants
//
// Fitting is a pluggable numerical capability behind the `Fitter` trait:
// the core only depends on the input/output contract, not on a specific
// implementation. `LeastSquaresFitter` is the default closed-form one.
//
// The charge transfer function below is shared with previously persisted
// calibration documents; its constants and the 0xF6 branch boundary must
// not change.

pub mod least_squares;

pub use least_squares::LeastSquaresFitter;

use crate::error::{ErrorCode, FitError};
use crate::stats::SampleStatistics;
use crate::store::{CalibrationKey, CalibrationStore};
use log::{debug, warn};

/// Result of a Gaussian fit over a histogram window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianFit {
    pub mean: f64,
    pub sigma: f64,
    pub mean_err: f64,
    pub sigma_err: f64,
}

/// Result of a straight-line fit through (x, y) points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub slope_err: f64,
    pub intercept_err: f64,
}

/// Pluggable fitting capability
///
/// Any implementation satisfying these contracts is conformant, whether
/// closed-form or iterative.
pub trait Fitter {
    /// Fit a Gaussian to `hist` restricted to bins `lo..=hi`
    fn fit_gaussian(&self, hist: &[u32], lo: usize, hi: usize) -> Result<GaussianFit, FitError>;

    /// Fit a line through the given (x, y) points
    fn fit_linear(&self, points: &[(f64, f64)]) -> Result<LinearFit, FitError>;
}

/// Charge injected by the calibration DAC, in Coulombs
///
/// Reproduces the injection circuit transfer function exactly. Above DAC
/// code 0xF6 the DAC output enters a fine-step region of 5 mV per code;
/// below it the step is 10 mV per code. The injection capacitor is 200 fF
/// and the high-calibration mode switches in a 22x larger capacitance.
pub fn injected_charge(dac: u8, positive: bool, high_calib: bool) -> f64 {
    let volt = if dac >= 0xF6 {
        2.5 - f64::from(0xFFu8 - dac) * 50.0 * 1e-4
    } else {
        f64::from(dac) * 100.0 * 1e-4
    };

    let mut charge = if positive {
        (2.5 - volt) * 200e-15
    } else {
        volt * 200e-15
    };

    if high_calib {
        charge *= 22.0;
    }
    charge
}

/// Reduces per-key accumulated statistics into calibration records
pub struct CurveFitter<F: Fitter> {
    fitter: F,
}

impl<F: Fitter> CurveFitter<F> {
    pub fn new(fitter: F) -> Self {
        Self { fitter }
    }

    /// Fit one key's statistics and write the record into the store
    ///
    /// Writes the raw baseline mean/rms, the Gaussian baseline fit and the
    /// linear calibration-curve fit. A failed fit leaves the affected
    /// fields at zero: downstream reconstruction treats a zero gain as
    /// "no calibration available" and passes raw values through.
    ///
    /// `b0_calib_high` applies the 22x injection capacitance to bucket 0
    /// only, matching the device configuration during calibration runs.
    pub fn fit_key(
        &self,
        key: &CalibrationKey,
        stats: &SampleStatistics,
        positive: bool,
        b0_calib_high: bool,
        store: &mut CalibrationStore,
    ) {
        let Some(record) = store.get_or_create(key) else {
            warn!(
                "[CurveFitter] Skipping out-of-bounds key {}:{}:{}:{}",
                key.device_id, key.channel, key.bucket, key.range
            );
            return;
        };

        record.base_mean = stats.baseline().mean();
        record.base_rms = stats.baseline().rms();

        // Gaussian baseline fit restricted to the observed ADC window
        if let Some((lo, hi)) = stats.observed_range() {
            match self
                .fitter
                .fit_gaussian(stats.histogram(), lo as usize, hi as usize)
            {
                Ok(fit) => {
                    record.base_fit_mean = fit.mean;
                    record.base_fit_sigma = fit.sigma;
                    record.base_fit_mean_err = fit.mean_err;
                    record.base_fit_sigma_err = fit.sigma_err;
                }
                Err(err) => {
                    warn!(
                        "[CurveFitter] Baseline fit failed for {}:{}:{}:{}: {}",
                        key.device_id,
                        key.channel,
                        key.bucket,
                        key.range,
                        err.message()
                    );
                }
            }
        }

        // Calibration curve: injected charge vs mean response per DAC level
        let high_calib = if key.bucket == 0 { b0_calib_high } else { false };
        let points: Vec<(f64, f64)> = stats
            .populated_dac_levels()
            .map(|dac| {
                (
                    injected_charge(dac, positive, high_calib),
                    stats.calib_level(dac).mean(),
                )
            })
            .collect();

        if !points.is_empty() {
            match self.fitter.fit_linear(&points) {
                Ok(fit) => {
                    record.calib_gain = fit.slope;
                    record.calib_intercept = fit.intercept;
                    record.calib_gain_err = fit.slope_err;
                    record.calib_intercept_err = fit.intercept_err;
                }
                Err(err) => {
                    debug!(
                        "[CurveFitter] Calibration fit skipped for {}:{}:{}:{}: {}",
                        key.device_id,
                        key.channel,
                        key.bucket,
                        key.range,
                        err.message()
                    );
                }
            }
        }
    }
}
