//! Generated file names for one stacking run.
//!
//! Every file macrostack writes into the working directory gets its name
//! here, so the three families stay distinguishable at a glance and unique
//! within (and across) runs:
//!
//! - `OUT*.tif` — transient aligned frames, written by `align_image_stack`
//!   under the fixed `OUT` prefix and deleted after every fusion
//! - `stack_<n>.tif` — per-batch artifacts, unique by batch index, retained
//!   after the run
//! - `<subject>Stacked<count>_<YYYYmmdd_HHMMSS>.tif` — the final image,
//!   unique per run by its seconds-resolution timestamp
//! - `<stem>_dev.<ext>` — normalized RAW temporaries, derived from the source
//!   stem so the original is never overwritten

use crate::config::RawTarget;
use chrono::{DateTime, Local};

/// Output prefix handed to `align_image_stack -a`.
pub const ALIGNED_PREFIX: &str = "OUT";

/// Extension the alignment tool gives its output frames.
const ALIGNED_SUFFIX: &str = ".tif";

/// Marker inserted between stem and extension for normalized RAW temporaries.
const DEV_MARKER: &str = "_dev";

/// Name of the fused artifact for one batch: `stack_0.tif`, `stack_1.tif`, …
pub fn batch_artifact(index: usize) -> String {
    format!("stack_{index}.tif")
}

/// Name of the final image.
///
/// The subject token is used verbatim, `count` is the number of original
/// input images (not batches), and the timestamp makes repeated runs in the
/// same directory distinct down to the second.
pub fn final_artifact(subject: &str, count: usize, when: &DateTime<Local>) -> String {
    format!("{subject}Stacked{count}_{}.tif", when.format("%Y%m%d_%H%M%S"))
}

/// Name for the developed copy of a RAW file: `IMG_0042.CR3` → `IMG_0042_dev.jpg`.
///
/// Derived from the source stem plus a fixed marker, so the temporary can
/// never collide with the original it was decoded from.
pub fn normalized(source: &str, target: RawTarget) -> String {
    let stem = source.rsplit_once('.').map(|(s, _)| s).unwrap_or(source);
    format!("{stem}{DEV_MARKER}.{}", target.extension())
}

/// Does this name belong to the alignment tool's transient output set?
pub fn is_aligned_output(name: &str) -> bool {
    name.starts_with(ALIGNED_PREFIX) && name.ends_with(ALIGNED_SUFFIX)
}
