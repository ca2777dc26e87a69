// Charge reconstruction from calibrated constants
//
// Converts a raw ADC sample into physical charge using the looked-up
// record: charge = (raw - base_fit_mean) / calib_gain. A zero gain means
// the channel was never calibrated; the raw value passes through
// unchanged as a deliberate fallback, not an error.
//
// Whether a reconstructed charge is trustworthy stays the caller's
// decision; `trusted` packages the standard gate (gain above the noise
// floor, bad-channel flag clear).

use crate::store::{CalibrationKey, CalibrationStore};

/// Effective gain regime of a sample
///
/// Up to three regimes apply depending on two device configuration flags
/// and the sample's own range bit. The numeric value is the conventional
/// 3-way gain-mode index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GainMode {
    Normal = 0,
    Double = 1,
    Low = 2,
}

impl GainMode {
    /// Gain-range index of the calibration key this mode selects
    ///
    /// The calibration store distinguishes two ranges: high (normal and
    /// double gain share the front-end range bit 0) and low (bit 1).
    pub fn range_index(self) -> u8 {
        match self {
            GainMode::Normal | GainMode::Double => 0,
            GainMode::Low => 1,
        }
    }
}

/// Derive the effective gain mode for one sample
///
/// Force-low-gain pins the front end to the low range; double-gain
/// overrides it; otherwise the sample's own range bit decides.
pub fn gain_mode(force_low_gain: bool, double_gain: bool, sample_range: u8) -> GainMode {
    let mut mode = GainMode::Normal;
    if force_low_gain {
        mode = GainMode::Low;
    }
    if double_gain {
        mode = GainMode::Double;
    }
    if mode == GainMode::Normal && sample_range == 1 {
        mode = GainMode::Low;
    }
    mode
}

/// Converts raw samples into physical charge using a calibration snapshot
#[derive(Debug)]
pub struct ChargeReconstructor<'a> {
    store: &'a CalibrationStore,
}

impl<'a> ChargeReconstructor<'a> {
    pub fn new(store: &'a CalibrationStore) -> Self {
        Self { store }
    }

    /// Reconstruct the charge for one sample
    ///
    /// Returns `None` when no record exists for the key, meaning no
    /// calibration is available and the caller must decide how to
    /// proceed. A record with zero gain yields the raw value unchanged.
    pub fn reconstruct(&self, key: &CalibrationKey, raw_value: f64) -> Option<f64> {
        let record = self.store.get(key)?;
        if record.calib_gain == 0.0 {
            return Some(raw_value);
        }
        Some((raw_value - record.base_fit_mean) / record.calib_gain)
    }

    /// Standard validity gate for a reconstructed charge
    ///
    /// True when the record exists, its gain magnitude exceeds the
    /// configured noise floor and the channel is not flagged bad.
    pub fn trusted(&self, key: &CalibrationKey, min_gain: f64) -> bool {
        self.store
            .get(key)
            .map_or(false, |r| r.calib_gain.abs() > min_gain && !r.bad_channel)
    }
}
