// Streaming statistics over the raw sample stream
//
// Everything here is one-pass: a calibration run on a real device can
// produce millions of samples per channel, so nothing is buffered. Mean
// and variance use Welford's update, which stays numerically stable for
// long streams where the naive sum-of-squares form loses precision.
//
// The accumulated state is transient. It exists only for the duration of
// the fitting pass and is consumed by the curve fitter; it never persists.

use crate::store::CalibrationKey;
use std::collections::HashMap;

/// Size of the raw ADC value domain (13-bit samples)
pub const ADC_BINS: usize = 8192;

/// Number of injection-DAC levels
pub const DAC_LEVELS: usize = 256;

/// Running count/mean/second-moment accumulator (Welford)
#[derive(Debug, Clone, Copy, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    rms: f64,
}

impl RunningStats {
    /// Fold one value into the running mean and second moment
    pub fn add(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    /// Finalize rms as the population standard deviation
    ///
    /// A zero count leaves rms at 0; it never divides.
    pub fn finalize(&mut self) {
        if self.count > 0 {
            self.rms = (self.m2 / self.count as f64).sqrt();
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Population rms, valid after `finalize`
    pub fn rms(&self) -> f64 {
        self.rms
    }
}

/// Per-key accumulated statistics for one fitting pass
///
/// Holds the baseline histogram over the full ADC domain (with observed
/// min/max for the fit window), baseline running statistics, and 256
/// independent running accumulators indexed by injection-DAC level.
#[derive(Debug, Clone)]
pub struct SampleStatistics {
    base_hist: Vec<u32>,
    base_min: u16,
    base_max: u16,
    baseline: RunningStats,
    calib: [RunningStats; DAC_LEVELS],
}

impl Default for SampleStatistics {
    fn default() -> Self {
        Self {
            base_hist: vec![0; ADC_BINS],
            base_min: ADC_BINS as u16,
            base_max: 0,
            baseline: RunningStats::default(),
            calib: [RunningStats::default(); DAC_LEVELS],
        }
    }
}

impl SampleStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one baseline sample
    pub fn add_baseline_point(&mut self, value: u16) {
        let bin = (value as usize).min(ADC_BINS - 1);
        self.base_hist[bin] += 1;
        if value < self.base_min {
            self.base_min = value;
        }
        if value > self.base_max {
            self.base_max = value;
        }
        self.baseline.add(value as f64);
    }

    /// Record one charge-injection sample at the given DAC level
    pub fn add_calibration_point(&mut self, dac: u8, value: u16) {
        self.calib[dac as usize].add(value as f64);
    }

    /// Finalize rms for the baseline and every populated DAC level
    pub fn compute(&mut self) {
        self.baseline.finalize();
        for stats in self.calib.iter_mut() {
            stats.finalize();
        }
    }

    pub fn baseline(&self) -> &RunningStats {
        &self.baseline
    }

    pub fn histogram(&self) -> &[u32] {
        &self.base_hist
    }

    /// Observed ADC min/max over the baseline samples, None when empty
    pub fn observed_range(&self) -> Option<(u16, u16)> {
        if self.baseline.count() > 0 {
            Some((self.base_min, self.base_max))
        } else {
            None
        }
    }

    pub fn calib_level(&self, dac: u8) -> &RunningStats {
        &self.calib[dac as usize]
    }

    /// DAC levels with at least one observed calibration point
    pub fn populated_dac_levels(&self) -> impl Iterator<Item = u8> + '_ {
        (0..DAC_LEVELS as u16)
            .map(|d| d as u8)
            .filter(|&d| self.calib[d as usize].count() > 0)
    }
}

/// Per-key statistics accumulation over the raw sample stream
///
/// Keys with out-of-bounds channel/bucket/range are dropped on entry so
/// the fitting pass never produces records the store would reject.
#[derive(Debug, Default)]
pub struct StatisticsAccumulator {
    stats: HashMap<CalibrationKey, SampleStatistics>,
}

impl StatisticsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_baseline_point(&mut self, key: &CalibrationKey, value: u16) {
        if !key.is_valid() {
            return;
        }
        self.stats
            .entry(key.clone())
            .or_default()
            .add_baseline_point(value);
    }

    pub fn add_calibration_point(&mut self, key: &CalibrationKey, dac: u8, value: u16) {
        if !key.is_valid() {
            return;
        }
        self.stats
            .entry(key.clone())
            .or_default()
            .add_calibration_point(dac, value);
    }

    /// Finalize rms for every accumulated key
    pub fn compute_all(&mut self) {
        for stats in self.stats.values_mut() {
            stats.compute();
        }
    }

    pub fn get(&self, key: &CalibrationKey) -> Option<&SampleStatistics> {
        self.stats.get(key)
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    /// Consume the accumulator, yielding each key with its statistics
    pub fn drain(self) -> impl Iterator<Item = (CalibrationKey, SampleStatistics)> {
        self.stats.into_iter()
    }
}
