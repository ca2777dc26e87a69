// CalibrationStore - per-(device, channel, bucket, range) constant storage
//
// The store is a single flat map keyed by the composite calibration key.
// Records are created lazily: the full key space (1024 channels x 4 buckets
// x 2 ranges per device) is never pre-allocated, a record exists only once
// some writer touches its key.
//
// Construction is single-threaded (document parse or calibration fit).
// Once populated the store is treated as an immutable snapshot, so any
// number of consumer threads may read it concurrently without locking.

use std::collections::HashMap;

/// Number of physical sensor channels per device
pub const MAX_CHANNELS: u16 = 1024;

/// Number of time-ordered sample buckets captured per channel per trigger
pub const MAX_BUCKETS: u8 = 4;

/// Number of gain ranges selectable per sample
pub const MAX_RANGES: u8 = 2;

/// Composite key addressing one calibration record
///
/// A key is valid only when channel, bucket and range are inside the
/// device geometry. Invalid keys are never stored and never returned.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CalibrationKey {
    /// Serial number of the ASIC instance
    pub device_id: String,
    /// Channel index, 0..1023
    pub channel: u16,
    /// Bucket index, 0..3
    pub bucket: u8,
    /// Gain range index, 0..1
    pub range: u8,
}

impl CalibrationKey {
    pub fn new(device_id: impl Into<String>, channel: u16, bucket: u8, range: u8) -> Self {
        Self {
            device_id: device_id.into(),
            channel,
            bucket,
            range,
        }
    }

    /// Check the channel/bucket/range bounds
    pub fn is_valid(&self) -> bool {
        self.channel < MAX_CHANNELS && self.bucket < MAX_BUCKETS && self.range < MAX_RANGES
    }
}

/// Calibration constants for one (device, channel, bucket, range)
///
/// All fields are zero-initialized on creation. A zero `calib_gain` is
/// meaningful downstream: charge reconstruction falls back to raw
/// pass-through for such records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalibrationRecord {
    /// Raw baseline mean (ADC counts)
    pub base_mean: f64,
    /// Raw baseline rms (ADC counts)
    pub base_rms: f64,
    /// Gaussian-fit baseline mean (ADC counts)
    pub base_fit_mean: f64,
    /// Gaussian-fit baseline sigma (ADC counts)
    pub base_fit_sigma: f64,
    pub base_fit_mean_err: f64,
    pub base_fit_sigma_err: f64,
    /// Calibration-curve slope (ADC counts per Coulomb)
    pub calib_gain: f64,
    /// Calibration-curve intercept (ADC counts)
    pub calib_intercept: f64,
    pub calib_gain_err: f64,
    pub calib_intercept_err: f64,
    /// Externally-supplied bad-channel overlay, never persisted
    pub bad_channel: bool,
}

/// Sparse keyed container of calibration records
#[derive(Debug, Default)]
pub struct CalibrationStore {
    records: HashMap<CalibrationKey, CalibrationRecord>,
}

impl CalibrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pure lookup, never creates
    ///
    /// Returns `None` for an invalid or unpopulated key.
    pub fn get(&self, key: &CalibrationKey) -> Option<&CalibrationRecord> {
        self.records.get(key)
    }

    /// Return the existing record or create a zero-initialized one
    ///
    /// Returns `None` and creates nothing when the key violates the
    /// channel/bucket/range bounds.
    pub fn get_or_create(&mut self, key: &CalibrationKey) -> Option<&mut CalibrationRecord> {
        if !key.is_valid() {
            return None;
        }
        Some(self.records.entry(key.clone()).or_default())
    }

    /// Number of populated records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over all populated records
    pub fn iter(&self) -> impl Iterator<Item = (&CalibrationKey, &CalibrationRecord)> {
        self.records.iter()
    }

    /// Flag or clear every populated record for one device channel
    ///
    /// The bad-channel flag has no writer path inside the fitting
    /// pipeline; it is an overlay supplied by an external channel-quality
    /// source after the store is built.
    pub fn set_bad_channel(&mut self, device_id: &str, channel: u16, bad: bool) {
        for (key, record) in self.records.iter_mut() {
            if key.device_id == device_id && key.channel == channel {
                record.bad_channel = bad;
            }
        }
    }

    // Zero-default accessors mirroring the consumer-facing reader API:
    // an unpopulated or invalid key reads as 0.0 rather than a fault.

    pub fn base_mean(&self, key: &CalibrationKey) -> f64 {
        self.get(key).map_or(0.0, |r| r.base_mean)
    }

    pub fn base_rms(&self, key: &CalibrationKey) -> f64 {
        self.get(key).map_or(0.0, |r| r.base_rms)
    }

    pub fn base_fit_mean(&self, key: &CalibrationKey) -> f64 {
        self.get(key).map_or(0.0, |r| r.base_fit_mean)
    }

    pub fn base_fit_sigma(&self, key: &CalibrationKey) -> f64 {
        self.get(key).map_or(0.0, |r| r.base_fit_sigma)
    }

    pub fn calib_gain(&self, key: &CalibrationKey) -> f64 {
        self.get(key).map_or(0.0, |r| r.calib_gain)
    }

    pub fn calib_intercept(&self, key: &CalibrationKey) -> f64 {
        self.get(key).map_or(0.0, |r| r.calib_intercept)
    }
}
