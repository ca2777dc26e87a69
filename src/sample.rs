// Raw sample records as produced by the event decoding layer
//
// The decoder itself lives outside this crate; the calibration core only
// consumes the per-sample tuples it emits. Samples are also serializable
// so offline tools can replay a dumped stream through the fitter.

use crate::store::CalibrationKey;
use serde::{Deserialize, Serialize};

/// Sample classification from the event stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleType {
    /// A real digitized channel sample
    Data,
    /// Temperature monitor readout
    Temperature,
    /// External trigger timestamp
    Trigger,
}

/// One digitized sample from the readout stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    /// Serial number of the originating ASIC
    pub device_id: String,
    /// Channel index, 0..1023
    pub channel: u16,
    /// Bucket index, 0..3
    pub bucket: u8,
    /// Gain range bit recorded with the sample
    pub range: u8,
    /// Digitized ADC value
    pub value: u16,
    pub sample_type: SampleType,
    /// Sample time in acquisition clock ticks
    pub timestamp: u32,
}

impl RawSample {
    /// Calibration key this sample belongs to
    pub fn key(&self) -> CalibrationKey {
        CalibrationKey::new(
            self.device_id.clone(),
            self.channel,
            self.bucket,
            self.range,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_key() {
        let sample = RawSample {
            device_id: "0x0123".to_string(),
            channel: 41,
            bucket: 2,
            range: 1,
            value: 812,
            sample_type: SampleType::Data,
            timestamp: 750,
        };
        let key = sample.key();
        assert_eq!(key.device_id, "0x0123");
        assert_eq!(key.channel, 41);
        assert_eq!(key.bucket, 2);
        assert_eq!(key.range, 1);
        assert!(key.is_valid());
    }

    #[test]
    fn test_sample_json_roundtrip() {
        let sample = RawSample {
            device_id: "0x0123".to_string(),
            channel: 41,
            bucket: 2,
            range: 0,
            value: 812,
            sample_type: SampleType::Data,
            timestamp: 750,
        };
        let json = serde_json::to_string(&sample).unwrap();
        let parsed: RawSample = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, sample);
    }
}
