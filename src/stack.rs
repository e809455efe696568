//! The stacking orchestrator.
//!
//! Drives the chunked two-phase reduction over a working directory:
//!
//! ```text
//! collect (sorted) → partition → [develop? → align → fuse → clean] per batch
//!                              → align + fuse the batch artifacts → final image
//!                              → copy metadata from the first input
//! ```
//!
//! The run is fully sequential and terminal on success or on the first
//! unrecovered error — a failed batch aborts the whole run, because a
//! silently missing batch would produce an incomplete final stack with no
//! way to detect it downstream. Per-batch `stack_*.tif` artifacts already
//! produced stay on disk for diagnosis or a manual re-fuse; the transient
//! `OUT*.tif` frames are deleted after every fusion so the next batch's
//! frame enumeration can never pick up stale output.
//!
//! Progress is reported through an optional channel of [`StackEvent`]s; the
//! binary drains it on a printer thread. The orchestrator itself never
//! prints and never prompts — everything it needs arrives resolved in a
//! [`StackJob`].

use crate::batch::{self, BatchError};
use crate::config::RawTarget;
use crate::naming;
use crate::raw;
use crate::scan::{self, ScanError};
use crate::tools::{ToolError, ToolRunner};
use chrono::Local;
use log::warn;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StackError {
    #[error("no .{extension} images found in {}", .dir.display())]
    NoImages { extension: String, dir: PathBuf },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Batch(#[from] BatchError),
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error("alignment produced no OUT frames ({0})")]
    NoAlignedOutput(String),
    #[error("fusion reported success but {0} was not written")]
    MissingArtifact(String),
}

/// Everything a run needs, resolved up front.
///
/// Interactive choices (extension, subject) and configuration (batch size,
/// RAW handling) are settled before the orchestrator starts; the working
/// directory is explicit rather than ambient.
#[derive(Debug, Clone)]
pub struct StackJob {
    pub dir: PathBuf,
    /// Extension whose files are stacked (exact, case-sensitive).
    pub extension: String,
    /// User-supplied token, used verbatim in the final file name.
    pub subject: String,
    pub batch_size: usize,
    /// Extensions developed with the RAW tool first (case-insensitive).
    pub raw_formats: Vec<String>,
    pub raw_target: RawTarget,
}

/// Progress notifications emitted during a run.
#[derive(Debug, Clone)]
pub enum StackEvent {
    RunStarted { inputs: usize, batches: usize },
    BatchStarted { index: usize, batches: usize, files: usize },
    Developing { index: usize, files: usize },
    Aligning { index: usize },
    Fusing { index: usize, artifact: String },
    FinalAligning { artifacts: usize },
    FinalFusing { output: String },
    MetadataCopied { donor: String },
    MetadataFailed { donor: String, error: String },
}

/// Summary of a completed run.
#[derive(Debug)]
pub struct StackOutcome {
    pub final_image: String,
    /// Count of original input images (not batches).
    pub input_count: usize,
    /// Per-batch artifacts, retained on disk for troubleshooting.
    pub batch_artifacts: Vec<String>,
    /// False when the metadata copy failed (non-fatal).
    pub metadata_applied: bool,
    pub elapsed: Duration,
}

/// Run the full reduction for `job`.
///
/// The metadata donor is the first file of the sorted input list. Note that
/// when stacking `.tif` inputs in a directory that already holds artifacts
/// from an earlier run, a generated file can sort first and become the
/// donor — the workflow assumes a directory of camera originals.
pub fn run(
    tools: &impl ToolRunner,
    job: &StackJob,
    progress: Option<Sender<StackEvent>>,
) -> Result<StackOutcome, StackError> {
    let started = Instant::now();

    let files = scan::files_with_extension(&job.dir, &job.extension)?;
    if files.is_empty() {
        return Err(StackError::NoImages {
            extension: job.extension.clone(),
            dir: job.dir.clone(),
        });
    }
    let batches = batch::partition(&files, job.batch_size)?;
    emit(
        &progress,
        StackEvent::RunStarted {
            inputs: files.len(),
            batches: batches.len(),
        },
    );

    let develop = raw::is_raw(&job.extension, &job.raw_formats);
    let mut artifacts = Vec::with_capacity(batches.len());
    for (index, batch_files) in batches.iter().enumerate() {
        emit(
            &progress,
            StackEvent::BatchStarted {
                index,
                batches: batches.len(),
                files: batch_files.len(),
            },
        );
        artifacts.push(reduce_batch(
            tools,
            job,
            index,
            batch_files,
            develop,
            &progress,
        )?);
    }

    let final_image = naming::final_artifact(&job.subject, files.len(), &Local::now());
    if artifacts.len() > 1 {
        emit(
            &progress,
            StackEvent::FinalAligning {
                artifacts: artifacts.len(),
            },
        );
        tools.align(&job.dir, &artifacts)?;
        let aligned = aligned_outputs(&job.dir)?;
        if aligned.is_empty() {
            return Err(StackError::NoAlignedOutput("final reduction".to_string()));
        }
        emit(
            &progress,
            StackEvent::FinalFusing {
                output: final_image.clone(),
            },
        );
        tools.fuse(&job.dir, &aligned, &final_image)?;
        remove_files(&job.dir, &aligned)?;
    } else {
        // A single artifact has nothing to be registered against.
        emit(
            &progress,
            StackEvent::FinalFusing {
                output: final_image.clone(),
            },
        );
        tools.fuse(&job.dir, &artifacts, &final_image)?;
    }
    if !job.dir.join(&final_image).exists() {
        return Err(StackError::MissingArtifact(final_image));
    }
    // Catch any straggler frames before declaring the directory clean.
    remove_files(&job.dir, &aligned_outputs(&job.dir)?)?;

    let donor = files[0].clone();
    let metadata_applied = match tools.copy_tags(&job.dir, &donor, &final_image) {
        Ok(()) => {
            emit(&progress, StackEvent::MetadataCopied { donor });
            true
        }
        Err(err) => {
            warn!("metadata copy from {donor} failed: {err}");
            emit(
                &progress,
                StackEvent::MetadataFailed {
                    donor,
                    error: err.to_string(),
                },
            );
            false
        }
    };

    Ok(StackOutcome {
        final_image,
        input_count: files.len(),
        batch_artifacts: artifacts,
        metadata_applied,
        elapsed: started.elapsed(),
    })
}

/// Reduce one batch to its `stack_<index>.tif` artifact.
fn reduce_batch(
    tools: &impl ToolRunner,
    job: &StackJob,
    index: usize,
    files: &[String],
    develop: bool,
    progress: &Option<Sender<StackEvent>>,
) -> Result<String, StackError> {
    let inputs = if develop {
        emit(
            progress,
            StackEvent::Developing {
                index,
                files: files.len(),
            },
        );
        raw::normalize(tools, &job.dir, files, job.raw_target)?
    } else {
        files.to_vec()
    };

    emit(progress, StackEvent::Aligning { index });
    let align_result = tools.align(&job.dir, &inputs);
    if develop {
        // Temporaries are consumed by alignment (or worthless after a failed
        // one); the originals are untouched either way.
        if let Err(err) = remove_files(&job.dir, &inputs) {
            warn!("could not remove developed temporaries: {err}");
        }
    }
    align_result?;

    let aligned = aligned_outputs(&job.dir)?;
    if aligned.is_empty() {
        return Err(StackError::NoAlignedOutput(format!("batch {index}")));
    }

    let artifact = naming::batch_artifact(index);
    emit(
        progress,
        StackEvent::Fusing {
            index,
            artifact: artifact.clone(),
        },
    );
    tools.fuse(&job.dir, &aligned, &artifact)?;
    if !job.dir.join(&artifact).exists() {
        return Err(StackError::MissingArtifact(artifact));
    }
    remove_files(&job.dir, &aligned)?;
    Ok(artifact)
}

/// The alignment tool's transient frames currently in `dir`, sorted.
fn aligned_outputs(dir: &Path) -> Result<Vec<String>, std::io::Error> {
    let mut frames = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if naming::is_aligned_output(&name) {
            frames.push(name);
        }
    }
    frames.sort();
    Ok(frames)
}

fn remove_files(dir: &Path, names: &[String]) -> Result<(), std::io::Error> {
    for name in names {
        fs::remove_file(dir.join(name))?;
    }
    Ok(())
}

fn emit(progress: &Option<Sender<StackEvent>>, event: StackEvent) {
    if let Some(tx) = progress {
        // A dropped receiver only means nobody is listening.
        let _ = tx.send(event);
    }
}
