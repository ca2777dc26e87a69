// Calibration document writer
//
// Serializes the store back into the calibration XML schema. Output is
// deterministic: devices, channels, buckets and ranges are emitted in
// sorted order regardless of map iteration order, so repeated exports of
// the same store are byte-identical.
//
// The bad-channel flag is an in-memory overlay and is not persisted.

use crate::error::DocumentError;
use crate::store::{CalibrationRecord, CalibrationStore};
use log::info;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Serialize the store into calibration document text
pub fn write_string(store: &CalibrationStore) -> String {
    // device -> channel -> bucket -> range -> record, sorted at every level
    type DeviceTree<'a> = BTreeMap<u16, BTreeMap<u8, BTreeMap<u8, &'a CalibrationRecord>>>;
    let mut tree: BTreeMap<&str, DeviceTree<'_>> = BTreeMap::new();
    for (key, record) in store.iter() {
        tree.entry(key.device_id.as_str())
            .or_default()
            .entry(key.channel)
            .or_default()
            .entry(key.bucket)
            .or_default()
            .insert(key.range, record);
    }

    let mut out = String::new();
    out.push_str("<calibrationData>\n");
    for (device, channels) in &tree {
        let _ = writeln!(out, "  <device id=\"{}\">", device);
        for (channel, buckets) in channels {
            let _ = writeln!(out, "    <Channel id=\"{}\">", channel);
            for (bucket, ranges) in buckets {
                let _ = writeln!(out, "      <Bucket id=\"{}\">", bucket);
                for (range, record) in ranges {
                    let _ = writeln!(out, "        <Range id=\"{}\">", range);
                    let _ = writeln!(out, "          <BaseMean>{}</BaseMean>", record.base_mean);
                    let _ = writeln!(out, "          <BaseRms>{}</BaseRms>", record.base_rms);
                    let _ = writeln!(
                        out,
                        "          <BaseFitMean>{}</BaseFitMean>",
                        record.base_fit_mean
                    );
                    let _ = writeln!(
                        out,
                        "          <BaseFitSigma>{}</BaseFitSigma>",
                        record.base_fit_sigma
                    );
                    let _ = writeln!(
                        out,
                        "          <BaseFitMeanErr>{}</BaseFitMeanErr>",
                        record.base_fit_mean_err
                    );
                    let _ = writeln!(
                        out,
                        "          <BaseFitSigmaErr>{}</BaseFitSigmaErr>",
                        record.base_fit_sigma_err
                    );
                    let _ = writeln!(
                        out,
                        "          <CalibGain>{}</CalibGain>",
                        record.calib_gain
                    );
                    let _ = writeln!(
                        out,
                        "          <CalibIntercept>{}</CalibIntercept>",
                        record.calib_intercept
                    );
                    let _ = writeln!(
                        out,
                        "          <CalibGainErr>{}</CalibGainErr>",
                        record.calib_gain_err
                    );
                    let _ = writeln!(
                        out,
                        "          <CalibInterceptErr>{}</CalibInterceptErr>",
                        record.calib_intercept_err
                    );
                    out.push_str("        </Range>\n");
                }
                out.push_str("      </Bucket>\n");
            }
            out.push_str("    </Channel>\n");
        }
        out.push_str("  </device>\n");
    }
    out.push_str("</calibrationData>\n");
    out
}

/// Write the store to a calibration file
pub fn write_file(path: impl AsRef<Path>, store: &CalibrationStore) -> Result<(), DocumentError> {
    let path = path.as_ref();
    fs::write(path, write_string(store)).map_err(|err| DocumentError::Io {
        path: path.display().to_string(),
        reason: err.to_string(),
    })?;
    info!(
        "[Document] Wrote calibration file {:?}: {} records",
        path,
        store.len()
    );
    Ok(())
}
