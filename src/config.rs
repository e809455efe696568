//! Run configuration.
//!
//! Settings load from an optional `macrostack.toml` in the working directory.
//! The file is sparse — only the values being overridden need to appear —
//! and unknown keys are rejected to catch typos early.
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [tools]
//! align = "align_image_stack"   # Hugin alignment tool
//! fuse = "enfuse"               # Hugin fusion tool
//! develop = "dcraw"             # RAW developer
//! exif = "exiftool"             # Metadata copier
//!
//! [stacking]
//! batch_size = 10                       # Images aligned+fused per batch
//! raw_formats = ["CR2", "CR3", "NEF"]   # Extensions developed before stacking
//! raw_target = "jpeg"                   # Stackable format: "jpeg" or "tiff"
//! ```
//!
//! Tool entries may be bare executable names (resolved via `PATH`) or
//! absolute paths, which is also how the integration tests substitute
//! scripted stand-ins for the real tools.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File name looked up in the working directory.
pub const CONFIG_FILE: &str = "macrostack.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `macrostack.toml`.
///
/// All fields have working defaults; user files need only override what
/// they want to change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StackerConfig {
    /// External executable names or paths.
    pub tools: ToolsConfig,
    /// Batching and RAW handling.
    pub stacking: StackingConfig,
}

impl StackerConfig {
    /// Validate config values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stacking.batch_size == 0 {
            return Err(ConfigError::Validation(
                "stacking.batch_size must be at least 1".into(),
            ));
        }
        for tool in [
            &self.tools.align,
            &self.tools.fuse,
            &self.tools.develop,
            &self.tools.exif,
        ] {
            if tool.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "tools entries must not be empty".into(),
                ));
            }
        }
        Ok(())
    }
}

/// External executables the pipeline shells out to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolsConfig {
    /// Alignment tool (Hugin's `align_image_stack`).
    pub align: String,
    /// Fusion tool (Hugin's `enfuse`).
    pub fuse: String,
    /// RAW developer (`dcraw`).
    pub develop: String,
    /// Metadata copier (`exiftool`).
    pub exif: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            align: "align_image_stack".to_string(),
            fuse: "enfuse".to_string(),
            develop: "dcraw".to_string(),
            exif: "exiftool".to_string(),
        }
    }
}

/// Batching and RAW-handling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StackingConfig {
    /// Number of images aligned and fused per batch. Bounds peak memory and
    /// disk use regardless of how many frames the session produced.
    pub batch_size: usize,
    /// Extensions treated as RAW and developed before stacking
    /// (case-insensitive match).
    pub raw_formats: Vec<String>,
    /// Intermediate format RAW files are developed into.
    pub raw_target: RawTarget,
}

impl Default for StackingConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            raw_formats: vec!["CR2".to_string(), "CR3".to_string(), "NEF".to_string()],
            raw_target: RawTarget::Jpeg,
        }
    }
}

/// Stackable intermediate format for developed RAW files.
///
/// JPEG is the default: side-by-side testing of the original workflow found
/// the fused result held more fine detail from JPEG intermediates, and the
/// temporaries are an order of magnitude smaller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RawTarget {
    #[default]
    Jpeg,
    Tiff,
}

impl RawTarget {
    /// Extension for normalized temporary file names.
    pub fn extension(self) -> &'static str {
        match self {
            RawTarget::Jpeg => "jpg",
            RawTarget::Tiff => "tif",
        }
    }
}

/// Load config from `macrostack.toml` in the given directory.
///
/// Missing file means defaults; a present file is parsed with unknown keys
/// rejected, then validated.
pub fn load_config(dir: &Path) -> Result<StackerConfig, ConfigError> {
    let path = dir.join(CONFIG_FILE);
    let config = if path.exists() {
        let content = fs::read_to_string(&path)?;
        toml::from_str(&content)?
    } else {
        StackerConfig::default()
    };
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `macrostack.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# macrostack configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Place this file as macrostack.toml in the directory you stack from.

# ---------------------------------------------------------------------------
# External tools
# ---------------------------------------------------------------------------
# Bare names are resolved via PATH; absolute paths work too.
[tools]
# Alignment tool (Hugin project).
align = "align_image_stack"

# Fusion tool (Hugin project).
fuse = "enfuse"

# RAW developer. Must support `-c -w -T` (TIFF to stdout, camera white
# balance).
develop = "dcraw"

# Metadata copier. Must support `-tagsFromFile` and `-overwrite_original`.
exif = "exiftool"

# ---------------------------------------------------------------------------
# Stacking
# ---------------------------------------------------------------------------
[stacking]
# Images aligned and fused per batch. Larger batches need more memory in the
# alignment tool; 10 keeps hundreds-of-frames sessions tractable.
batch_size = 10

# Extensions developed with the RAW tool before stacking (matched
# case-insensitively against the chosen extension).
raw_formats = ["CR2", "CR3", "NEF"]

# Intermediate format for developed RAW files: "jpeg" or "tiff".
raw_target = "jpeg"
"##
}
