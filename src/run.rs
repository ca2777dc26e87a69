// Calibration run driver - sample stream to populated store
//
// Replays a calibration acquisition through the statistics accumulator:
// only Data samples are consumed, samples are gated on the per-bucket
// injection-time windows, Baseline-state samples feed the baseline
// accumulator and Inject-state samples (for the currently pulsed channel)
// feed the per-DAC accumulators. `finish` then fits every accumulated key
// into a fresh store.

use crate::fit::{CurveFitter, Fitter};
use crate::sample::{RawSample, SampleType};
use crate::stats::StatisticsAccumulator;
use crate::store::CalibrationStore;
use log::info;
use serde::{Deserialize, Serialize};

/// Acquisition state of the calibration run at a given event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalState {
    Idle,
    Baseline,
    Inject,
}

/// Run status accompanying each event in the stream
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunSettings {
    pub cal_state: CalState,
    /// Channel currently driven by the injection DAC
    pub cal_channel: u16,
    /// Current injection DAC code
    pub cal_dac: u8,
}

/// Streaming calibration pass over raw samples
#[derive(Debug, Default)]
pub struct CalibrationRun {
    accum: StatisticsAccumulator,
    /// Cumulative injection-time boundaries per bucket; bucket b accepts
    /// samples with windows[b] < timestamp < windows[b+1]. None disables
    /// time gating.
    windows: Option<[u32; 5]>,
    consumed: u64,
}

impl CalibrationRun {
    pub fn new(windows: Option<[u32; 5]>) -> Self {
        Self {
            accum: StatisticsAccumulator::new(),
            windows,
            consumed: 0,
        }
    }

    /// Route one sample into the accumulator
    pub fn process_sample(&mut self, sample: &RawSample, settings: &RunSettings) {
        if sample.sample_type != SampleType::Data {
            return;
        }
        let key = sample.key();
        if !key.is_valid() {
            return;
        }

        if let Some(w) = self.windows {
            let b = sample.bucket as usize;
            if !(sample.timestamp > w[b] && sample.timestamp < w[b + 1]) {
                return;
            }
        }

        match settings.cal_state {
            CalState::Baseline => {
                self.accum.add_baseline_point(&key, sample.value);
                self.consumed += 1;
            }
            CalState::Inject if sample.channel == settings.cal_channel => {
                self.accum
                    .add_calibration_point(&key, settings.cal_dac, sample.value);
                self.consumed += 1;
            }
            _ => {}
        }
    }

    /// Samples accepted so far
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Keys with accumulated statistics
    pub fn key_count(&self) -> usize {
        self.accum.len()
    }

    /// Finalize statistics and fit every key into a fresh store
    pub fn finish<F: Fitter>(
        mut self,
        fitter: &CurveFitter<F>,
        positive: bool,
        b0_calib_high: bool,
    ) -> CalibrationStore {
        self.accum.compute_all();
        let mut store = CalibrationStore::new();
        let keys = self.accum.len();
        for (key, stats) in self.accum.drain() {
            fitter.fit_key(&key, &stats, positive, b0_calib_high, &mut store);
        }
        info!(
            "[CalibrationRun] Fitted {} keys from {} samples",
            keys, self.consumed
        );
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::{injected_charge, LeastSquaresFitter};
    use crate::store::CalibrationKey;

    fn sample(channel: u16, bucket: u8, value: u16, timestamp: u32) -> RawSample {
        RawSample {
            device_id: "0x0123".to_string(),
            channel,
            bucket,
            range: 0,
            value,
            sample_type: SampleType::Data,
            timestamp,
        }
    }

    const BASELINE: RunSettings = RunSettings {
        cal_state: CalState::Baseline,
        cal_channel: 0,
        cal_dac: 0,
    };

    #[test]
    fn test_non_data_samples_ignored() {
        let mut run = CalibrationRun::new(None);
        let mut s = sample(1, 0, 400, 100);
        s.sample_type = SampleType::Temperature;
        run.process_sample(&s, &BASELINE);
        s.sample_type = SampleType::Trigger;
        run.process_sample(&s, &BASELINE);

        assert_eq!(run.consumed(), 0);
        assert_eq!(run.key_count(), 0);
    }

    #[test]
    fn test_idle_state_ignored() {
        let mut run = CalibrationRun::new(None);
        let settings = RunSettings {
            cal_state: CalState::Idle,
            cal_channel: 0,
            cal_dac: 0,
        };
        run.process_sample(&sample(1, 0, 400, 100), &settings);
        assert_eq!(run.consumed(), 0);
    }

    #[test]
    fn test_time_window_gating() {
        let windows = Some([0u32, 700, 1400, 2100, 8192]);
        let mut run = CalibrationRun::new(windows);

        // Bucket 0 accepts 0 < t < 700
        run.process_sample(&sample(1, 0, 400, 350), &BASELINE);
        run.process_sample(&sample(1, 0, 400, 700), &BASELINE); // boundary rejected
        run.process_sample(&sample(1, 0, 400, 900), &BASELINE); // late rejected

        // Bucket 1 accepts 700 < t < 1400
        run.process_sample(&sample(1, 1, 400, 900), &BASELINE);
        run.process_sample(&sample(1, 1, 400, 350), &BASELINE); // early rejected

        assert_eq!(run.consumed(), 2);
    }

    #[test]
    fn test_inject_requires_matching_channel() {
        let mut run = CalibrationRun::new(None);
        let settings = RunSettings {
            cal_state: CalState::Inject,
            cal_channel: 7,
            cal_dac: 100,
        };
        run.process_sample(&sample(7, 0, 900, 100), &settings);
        run.process_sample(&sample(8, 0, 900, 100), &settings); // cross-talk ignored
        assert_eq!(run.consumed(), 1);
    }

    #[test]
    fn test_full_pass_produces_calibrated_store() {
        let mut run = CalibrationRun::new(None);

        // Baseline pass
        for _ in 0..200 {
            run.process_sample(&sample(7, 0, 400, 100), &BASELINE);
            run.process_sample(&sample(7, 0, 401, 100), &BASELINE);
        }

        // Injection pass over several DAC levels
        let gain = 2.0e15;
        for dac in [40u8, 90, 140, 190, 240] {
            let settings = RunSettings {
                cal_state: CalState::Inject,
                cal_channel: 7,
                cal_dac: dac,
            };
            let response = 400.5 + gain * injected_charge(dac, false, false);
            for _ in 0..20 {
                run.process_sample(&sample(7, 0, response.round() as u16, 100), &settings);
            }
        }

        let fitter = CurveFitter::new(LeastSquaresFitter::new());
        let store = run.finish(&fitter, false, false);

        assert_eq!(store.len(), 1);
        let key = CalibrationKey::new("0x0123", 7, 0, 0);
        let record = store.get(&key).unwrap();
        assert!((record.base_mean - 400.5).abs() < 0.01);
        assert!((record.calib_gain - gain).abs() / gain < 0.01);
    }
}
