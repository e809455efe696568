//! Working-directory scanning.
//!
//! Two read-only views of the same directory listing feed the pipeline:
//!
//! - [`census`] counts every regular file by extension, so the user can be
//!   shown what is actually in the directory before committing to a run.
//! - [`files_with_extension`] collects the chosen extension's files in
//!   lexicographic order. That order is load-bearing: focus brackets come
//!   off the camera with sequential names, and the sorted list is committed
//!   as the correspondence order for alignment.
//!
//! Neither function recurses — the stacking workflow operates on exactly one
//! directory by contract.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Count every regular file in `dir` by extension.
///
/// The key is the substring after the last `.` in the file name; a name with
/// no dot is keyed by the whole name. Keys are case-sensitive as scanned, so
/// `IMG.CR3` and `img.cr3` count separately — matching how the files will be
/// collected later.
pub fn census(dir: &Path) -> Result<BTreeMap<String, usize>, ScanError> {
    let mut counts = BTreeMap::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        let ext = name.rsplit('.').next().unwrap_or(&name).to_string();
        *counts.entry(ext).or_insert(0) += 1;
    }
    Ok(counts)
}

/// Collect the names of regular files in `dir` ending in `.<ext>`, sorted
/// lexicographically.
///
/// The match is exact and case-sensitive, like the census keys it is always
/// paired with.
pub fn files_with_extension(dir: &Path, ext: &str) -> Result<Vec<String>, ScanError> {
    let suffix = format!(".{ext}");
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if name.ends_with(&suffix) {
            files.push(name);
        }
    }
    files.sort();
    Ok(files)
}
