//! RAW development into a stackable format.
//!
//! The alignment tool cannot read camera RAW files, so RAW batches are first
//! developed into ordinary images: `dcraw` decodes each file with camera
//! white balance and streams a TIFF to stdout, which is written out either
//! verbatim or re-encoded as a high-quality JPEG (the default — fused
//! results from JPEG intermediates held more fine detail in side-by-side
//! testing, and the temporaries are far smaller).
//!
//! Developed files are temporaries named `<stem>_dev.<ext>` next to their
//! sources; the originals are never modified, moved, or deleted. The
//! orchestrator deletes the temporaries once alignment has consumed them.

use crate::config::RawTarget;
use crate::naming;
use crate::tools::{ToolError, ToolRunner};
use std::fs;
use std::path::Path;

/// JPEG quality for developed intermediates — maximum practical, the point
/// where further bits stop changing the fused output.
const JPEG_QUALITY: u8 = 98;

/// Is this extension one of the configured RAW formats?
///
/// Matching is case-insensitive: cameras and users disagree about `CR3`
/// versus `cr3`.
pub fn is_raw(extension: &str, formats: &[String]) -> bool {
    formats.iter().any(|f| f.eq_ignore_ascii_case(extension))
}

/// Develop every file of a batch into a stackable temporary.
///
/// Returns the developed file names in input order. A development failure is
/// fatal for the batch — skipping a file would silently drop a focus plane
/// from the stack — and temporaries already written are removed before the
/// error propagates. Sources are left untouched either way.
pub fn normalize(
    tools: &impl ToolRunner,
    dir: &Path,
    files: &[String],
    target: RawTarget,
) -> Result<Vec<String>, ToolError> {
    let mut developed = Vec::with_capacity(files.len());
    for source in files {
        let output = naming::normalized(source, target);
        if let Err(err) = tools.develop(dir, source, &output, target) {
            for name in &developed {
                let _ = fs::remove_file(dir.join(name));
            }
            return Err(err);
        }
        developed.push(output);
    }
    Ok(developed)
}

/// Re-encode a developed TIFF stream as a maximum-practical-quality JPEG.
pub fn encode_stackable(tiff: &[u8]) -> Result<Vec<u8>, image::ImageError> {
    let decoded = image::load_from_memory_with_format(tiff, image::ImageFormat::Tiff)?;
    let mut jpeg = Vec::new();
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY);
    decoded.to_rgb8().write_with_encoder(encoder)?;
    Ok(jpeg)
}
