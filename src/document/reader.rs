// Calibration document parser
//
// Recursive depth-first walk carrying an inherited context (device,
// channel, bucket, range) from parent to child. A structural node
// overrides one context field for its own subtree only; the context is
// passed by value so sibling subtrees never see each other's overrides.
//
// Exported calibration files are often partial or hand-edited, so a leaf
// whose context resolves out of bounds is dropped silently instead of
// aborting the parse. Only an unreadable file or a document that is not
// well-formed XML fails the whole call, and that is checked before any
// store mutation.

use crate::error::DocumentError;
use crate::store::{
    CalibrationKey, CalibrationRecord, CalibrationStore, MAX_BUCKETS, MAX_CHANNELS, MAX_RANGES,
};
use log::{debug, info};
use std::fs;
use std::path::Path;

/// Inherited parse context, copied per subtree
#[derive(Debug, Clone, Default)]
struct ParseContext {
    device: String,
    channel: u32,
    bucket: u32,
    range: u32,
}

impl ParseContext {
    fn in_bounds(&self) -> bool {
        self.channel < u32::from(MAX_CHANNELS)
            && self.bucket < u32::from(MAX_BUCKETS)
            && self.range < u32::from(MAX_RANGES)
    }
}

/// Parse a calibration file into the store
pub fn parse_file(path: impl AsRef<Path>, store: &mut CalibrationStore) -> Result<(), DocumentError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|err| DocumentError::Io {
        path: path.display().to_string(),
        reason: err.to_string(),
    })?;
    parse_str(&text, store)?;
    info!(
        "[Document] Parsed calibration file {:?}: {} records",
        path,
        store.len()
    );
    Ok(())
}

/// Parse calibration document text into the store
///
/// Well-formedness is verified up front, so a failed parse leaves the
/// store in its prior state.
pub fn parse_str(text: &str, store: &mut CalibrationStore) -> Result<(), DocumentError> {
    let doc = roxmltree::Document::parse(text).map_err(|err| DocumentError::Malformed {
        reason: err.to_string(),
    })?;
    walk(doc.root_element(), ParseContext::default(), store);
    Ok(())
}

fn walk(node: roxmltree::Node, ctx: ParseContext, store: &mut CalibrationStore) {
    for child in node.children() {
        if !child.is_element() {
            continue;
        }

        let mut ctx = ctx.clone();
        let tag = child.tag_name().name();
        match tag {
            "device" => ctx.device = child.attribute("id").unwrap_or("").to_string(),
            "Channel" => ctx.channel = id_attr(&child),
            "Bucket" => ctx.bucket = id_attr(&child),
            "Range" => ctx.range = id_attr(&child),
            _ => apply_leaf(tag, &child, &ctx, store),
        }

        walk(child, ctx, store);
    }
}

/// Integer `id` attribute; missing or non-numeric ids fall back to 0
fn id_attr(node: &roxmltree::Node) -> u32 {
    node.attribute("id")
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0)
}

fn apply_leaf(tag: &str, node: &roxmltree::Node, ctx: &ParseContext, store: &mut CalibrationStore) {
    let setter: fn(&mut CalibrationRecord, f64) = match tag {
        "BaseMean" => |r, v| r.base_mean = v,
        "BaseRms" => |r, v| r.base_rms = v,
        "BaseFitMean" => |r, v| r.base_fit_mean = v,
        "BaseFitSigma" => |r, v| r.base_fit_sigma = v,
        "BaseFitMeanErr" => |r, v| r.base_fit_mean_err = v,
        "BaseFitSigmaErr" => |r, v| r.base_fit_sigma_err = v,
        "CalibGain" => |r, v| r.calib_gain = v,
        "CalibIntercept" => |r, v| r.calib_intercept = v,
        "CalibGainErr" => |r, v| r.calib_gain_err = v,
        "CalibInterceptErr" => |r, v| r.calib_intercept_err = v,
        // Unrecognized tags are ignored
        _ => return,
    };

    let Some(value) = node.text().and_then(|t| t.trim().parse::<f64>().ok()) else {
        return;
    };

    if !ctx.in_bounds() {
        debug!(
            "[Document] Dropping out-of-bounds leaf <{}> at channel={} bucket={} range={}",
            tag, ctx.channel, ctx.bucket, ctx.range
        );
        return;
    }

    let key = CalibrationKey::new(
        ctx.device.clone(),
        ctx.channel as u16,
        ctx.bucket as u8,
        ctx.range as u8,
    );
    if let Some(record) = store.get_or_create(&key) {
        setter(record, value);
    }
}
