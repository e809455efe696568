//! # macrostack
//!
//! Batch focus stacking for macro photography. Point it at a directory of
//! focus-bracketed captures and it aligns and fuses them into a single image
//! with extended depth of field, delegating the heavy lifting to the Hugin
//! command-line tools (`align_image_stack`, `enfuse`) plus `dcraw` and
//! `exiftool`.
//!
//! # Architecture: Chunked Two-Phase Reduction
//!
//! Macro sessions routinely produce hundreds of frames, and feeding them all
//! to the alignment tool in one go exhausts memory. macrostack instead
//! reduces in two phases:
//!
//! ```text
//! 1. Per batch   sorted inputs → batches of 10 → align → fuse → stack_<n>.tif
//! 2. Final       stack_*.tif artifacts → align → fuse → <subject>Stacked<count>_<ts>.tif
//! ```
//!
//! Each batch is aligned and fused independently, bounding peak memory and
//! disk use regardless of how many frames the session produced. The
//! per-batch artifacts are then aligned and fused once more into the final
//! image (a single batch skips that alignment — there is nothing to register
//! it against). Transient `OUT*.tif` frames written by the alignment tool
//! are deleted after every fusion so the next batch starts from a clean
//! directory.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Extension census of the working directory, sorted collection of the chosen extension's files |
//! | [`batch`] | Fixed-size partitioning of the sorted file list |
//! | [`naming`] | Every generated file name: batch artifacts, the final image, normalized temporaries, aligned-frame detection |
//! | [`raw`] | RAW development into a stackable format via `dcraw`, originals untouched |
//! | [`tools`] | The [`ToolRunner`](tools::ToolRunner) seam over the external executables |
//! | [`stack`] | The reduction state machine: batch loop, final reduction, cleanup, metadata propagation |
//! | [`config`] | `macrostack.toml` loading, validation, and the stock config for `gen-config` |
//! | [`output`] | CLI display — pure formatting functions plus print wrappers |
//!
//! # Design Decisions
//!
//! ## External Tools, Explicit Argv
//!
//! Alignment and fusion quality come from Hugin's battle-tested
//! implementations; macrostack is only the orchestration layer. Unlike the
//! classic shell-script approach, intermediate frames are never matched with
//! a shell glob: the orchestrator enumerates `OUT*.tif` itself and hands the
//! tools explicit file lists, so no shell is involved and odd file names
//! cannot change the command line.
//!
//! ## Lexical Order Is Capture Order
//!
//! Focus brackets come off the camera with sequential names, so the sorted
//! file list is committed as the correspondence order for alignment. Files
//! must be named such that lexical order equals capture order.
//!
//! ## Originals Are Never Touched
//!
//! RAW development writes `<stem>_dev.<ext>` temporaries and deletes only
//! those; per-batch `stack_*.tif` artifacts are deliberately retained after
//! a run for troubleshooting a bad final fuse.
//!
//! ## Sequential by Contract
//!
//! The run is single-threaded and every tool invocation blocks until the
//! subprocess exits, with no timeout — a hung tool hangs the run. The
//! `OUT*.tif` frames are shared state between the align and fuse steps of
//! consecutive batches, so the design presumes exclusive use of the working
//! directory for the duration of a run.

pub mod batch;
pub mod config;
pub mod naming;
pub mod output;
pub mod raw;
pub mod scan;
pub mod stack;
pub mod tools;
