//! External tool invocation.
//!
//! Everything that actually touches pixels happens in subprocesses:
//! `align_image_stack` and `enfuse` (Hugin), `dcraw`, and `exiftool`. The
//! [`ToolRunner`] trait is the seam between the orchestrator and those
//! executables, so pipeline logic can be tested against a recording mock
//! without any of them installed.
//!
//! Invocation rules, uniform across all four tools:
//!
//! - Arguments are passed as explicit argv entries — no shell, no glob
//!   expansion, so file names can never alter the command line.
//! - Every call blocks until the subprocess exits and captures stdout and
//!   stderr. Output is logged; on a nonzero exit it is embedded in the
//!   returned [`ToolError::Failed`] so the user sees what the tool said.
//! - Executable names come from [`ToolsConfig`], which lets tests (and
//!   unusual installs) substitute paths for the stock names.

use crate::config::{RawTarget, ToolsConfig};
use crate::naming;
use crate::raw;
use log::{debug, info};
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("failed to run {tool}: {source}")]
    Launch {
        tool: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{tool} failed ({status})\n{output}")]
    Failed {
        tool: String,
        status: String,
        output: String,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not re-encode developed image: {0}")]
    Encode(#[from] image::ImageError),
}

/// The four external operations the pipeline is built from.
///
/// All operations are synchronous and run with the working directory as the
/// subprocess cwd, so the file names they receive and produce stay relative.
pub trait ToolRunner {
    /// Register `images` against each other, writing `OUT*.tif` frames into
    /// `dir` as a side effect.
    fn align(&self, dir: &Path, images: &[String]) -> Result<(), ToolError>;

    /// Blend `inputs` (already aligned) into `output`, keeping the sharpest
    /// regions of each.
    fn fuse(&self, dir: &Path, inputs: &[String], output: &str) -> Result<(), ToolError>;

    /// Develop a RAW `source` into a stackable `output` in the given target
    /// format. Never modifies `source`.
    fn develop(
        &self,
        dir: &Path,
        source: &str,
        output: &str,
        target: RawTarget,
    ) -> Result<(), ToolError>;

    /// Copy all metadata tags from `donor` into `recipient`, overwriting
    /// `recipient` in place.
    fn copy_tags(&self, dir: &Path, donor: &str, recipient: &str) -> Result<(), ToolError>;
}

/// Production [`ToolRunner`] that shells out to the configured executables.
pub struct SystemTools {
    tools: ToolsConfig,
}

impl SystemTools {
    pub fn new(tools: &ToolsConfig) -> Self {
        Self {
            tools: tools.clone(),
        }
    }

    fn align_command(&self, dir: &Path, images: &[String]) -> Command {
        let mut cmd = Command::new(&self.tools.align);
        cmd.current_dir(dir)
            .arg("-m")
            .arg("-a")
            .arg(naming::ALIGNED_PREFIX)
            .args(images);
        cmd
    }

    fn fuse_command(&self, dir: &Path, inputs: &[String], output: &str) -> Command {
        let mut cmd = Command::new(&self.tools.fuse);
        cmd.current_dir(dir)
            .arg("--exposure-weight=0")
            .arg("--saturation-weight=0")
            .arg("--contrast-weight=1")
            .arg("--hard-mask")
            .arg(format!("--output={output}"))
            .args(inputs);
        cmd
    }

    fn develop_command(&self, dir: &Path, source: &str) -> Command {
        let mut cmd = Command::new(&self.tools.develop);
        // -c: write to stdout, -w: camera white balance, -T: TIFF output
        cmd.current_dir(dir).args(["-c", "-w", "-T"]).arg(source);
        cmd
    }

    fn exif_command(&self, dir: &Path, donor: &str, recipient: &str) -> Command {
        let mut cmd = Command::new(&self.tools.exif);
        cmd.current_dir(dir)
            .arg("-tagsFromFile")
            .arg(donor)
            .arg("-overwrite_original")
            .arg(recipient);
        cmd
    }

    /// Run a built command, returning its output on exit code 0 and a
    /// [`ToolError::Failed`] carrying everything the tool printed otherwise.
    fn checked(mut cmd: Command, tool: &str) -> Result<Output, ToolError> {
        debug!("running: {}", render(&cmd));
        let output = cmd.output().map_err(|source| ToolError::Launch {
            tool: tool.to_string(),
            source,
        })?;
        if !output.status.success() {
            let mut transcript = String::from_utf8_lossy(&output.stdout).into_owned();
            transcript.push_str(&String::from_utf8_lossy(&output.stderr));
            return Err(ToolError::Failed {
                tool: tool.to_string(),
                status: output.status.to_string(),
                output: transcript.trim().to_string(),
            });
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            debug!("{tool} stderr: {}", stderr.trim());
        }
        Ok(output)
    }

    fn log_transcript(tool: &str, stdout: &[u8]) {
        let text = String::from_utf8_lossy(stdout);
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            info!("{tool}: {line}");
        }
    }
}

impl ToolRunner for SystemTools {
    fn align(&self, dir: &Path, images: &[String]) -> Result<(), ToolError> {
        let output = Self::checked(self.align_command(dir, images), &self.tools.align)?;
        Self::log_transcript(&self.tools.align, &output.stdout);
        Ok(())
    }

    fn fuse(&self, dir: &Path, inputs: &[String], output_name: &str) -> Result<(), ToolError> {
        let output = Self::checked(
            self.fuse_command(dir, inputs, output_name),
            &self.tools.fuse,
        )?;
        Self::log_transcript(&self.tools.fuse, &output.stdout);
        Ok(())
    }

    fn develop(
        &self,
        dir: &Path,
        source: &str,
        output: &str,
        target: RawTarget,
    ) -> Result<(), ToolError> {
        // stdout is the developed TIFF stream, not text — never logged.
        let developed = Self::checked(self.develop_command(dir, source), &self.tools.develop)?;
        let bytes = match target {
            RawTarget::Tiff => developed.stdout,
            RawTarget::Jpeg => raw::encode_stackable(&developed.stdout)?,
        };
        fs::write(dir.join(output), bytes)?;
        debug!("developed {source} → {output}");
        Ok(())
    }

    fn copy_tags(&self, dir: &Path, donor: &str, recipient: &str) -> Result<(), ToolError> {
        let output = Self::checked(self.exif_command(dir, donor, recipient), &self.tools.exif)?;
        Self::log_transcript(&self.tools.exif, &output.stdout);
        Ok(())
    }
}

fn render(cmd: &Command) -> String {
    let mut parts = vec![cmd.get_program().to_string_lossy().into_owned()];
    parts.extend(cmd.get_args().map(|a| a.to_string_lossy().into_owned()));
    parts.join(" ")
}
