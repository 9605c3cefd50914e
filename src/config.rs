//! Execution configuration module.
//!
//! Handles loading, validating, and merging `magick.toml`. Stock defaults are
//! the base layer; a user file and command-line flags are merged on top.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! binaries = "imagemagick"   # or "graphicsmagick"
//! path_to_binaries = ""      # Directory holding convert/identify/gm ("" = search PATH)
//! locale = ""                # LC_CTYPE used while escaping ("" = keep current)
//! debug = false              # Emit command lines and captured output
//! prepend = ""               # Arguments placed before all others on convert
//! quality = 75               # Output quality (0-100)
//! working_dir = ""           # Directory commands run from ("" = current dir)
//! # timeout_secs = 60        # Kill tools that run longer (omit for no limit)
//! # path_restriction = "/srv/www:/tmp"  # Host path policy, reported by `check`
//!
//! [advanced]
//! density = false            # Resample to 72 ppi
//! colorspace = ""            # "RGB", "sRGB" or "GRAY" ("" = leave as is)
//! profile = ""               # ICC profile path; overrides colorspace
//!
//! [processing]
//! max_processes = 4          # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::exec::Package;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Colorspaces accepted by `[advanced] colorspace`.
pub const COLORSPACES: &[&str] = &["RGB", "sRGB", "GRAY"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `magick.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MagickConfig {
    /// Which graphics suite to drive.
    pub binaries: Package,
    /// Directory containing the executables. Empty means look them up on `PATH`.
    pub path_to_binaries: PathBuf,
    /// Locale switched to while escaping arguments. Empty keeps the current one.
    pub locale: String,
    /// Surface command lines and captured streams on the diagnostic channel.
    pub debug: bool,
    /// Extra arguments placed at the front of every convert command line.
    pub prepend: String,
    /// Output quality, 0 (worst) to 100 (best).
    pub quality: u32,
    /// Directory relative paths are resolved against. Empty means the current directory.
    pub working_dir: PathBuf,
    /// Wall-clock limit per tool invocation, in seconds.
    pub timeout_secs: Option<u64>,
    /// Description of a host path-restriction policy, if one applies.
    pub path_restriction: Option<String>,
    pub advanced: AdvancedConfig,
    pub processing: ProcessingConfig,
}

impl Default for MagickConfig {
    fn default() -> Self {
        Self {
            binaries: Package::ImageMagick,
            path_to_binaries: PathBuf::new(),
            locale: String::new(),
            debug: false,
            prepend: String::new(),
            quality: 75,
            working_dir: PathBuf::new(),
            timeout_secs: None,
            path_restriction: None,
            advanced: AdvancedConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl MagickConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.quality > 100 {
            return Err(ConfigError::Validation("quality must be 0-100".into()));
        }
        if self.timeout_secs == Some(0) {
            return Err(ConfigError::Validation(
                "timeout_secs must be greater than zero".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be greater than zero".into(),
            ));
        }
        let colorspace = &self.advanced.colorspace;
        if !colorspace.is_empty() && !COLORSPACES.contains(&colorspace.as_str()) {
            return Err(ConfigError::Validation(format!(
                "advanced.colorspace must be one of {} (got {colorspace:?})",
                COLORSPACES.join(", ")
            )));
        }
        Ok(())
    }

    /// Locale to escape under, or `None` when unset.
    pub fn escape_locale(&self) -> Option<&str> {
        (!self.locale.is_empty()).then_some(self.locale.as_str())
    }

    /// Prepend arguments split on whitespace, in order.
    pub fn prepend_args(&self) -> Vec<String> {
        self.prepend.split_whitespace().map(str::to_string).collect()
    }
}

/// Optional post-processing applied to every convert.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdvancedConfig {
    /// Resample density to 72 pixels per inch.
    pub density: bool,
    /// Target colorspace; ignored when a profile is set.
    pub colorspace: String,
    /// Color profile file all outputs are converted to.
    pub profile: String,
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel tool invocations in `batch`.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(MagickConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge overlays onto a base value in order, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlays: impl IntoIterator<Item = toml::Value>,
) -> Result<MagickConfig, ConfigError> {
    let merged = overlays.into_iter().fold(base, merge_toml);
    let config: MagickConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, falling back to stock defaults if it is missing.
///
/// `overrides` (typically built from command-line flags) is merged last.
pub fn load_config(
    path: &Path,
    overrides: Option<toml::Value>,
) -> Result<MagickConfig, ConfigError> {
    let base = stock_defaults_value();
    let file = load_raw_config(path)?;
    resolve_config(base, file.into_iter().chain(overrides))
}

/// Returns a fully-commented stock `magick.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# magick-exec Configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# Graphics suite: "imagemagick" (convert + identify) or "graphicsmagick" (gm).
binaries = "imagemagick"

# Directory containing the executables. Leave empty to search PATH.
path_to_binaries = ""

# Locale (LC_CTYPE) active while arguments are escaped, e.g. "en_US.UTF-8".
# Leave empty to keep the process locale. `magick-exec locales` lists candidates.
locale = ""

# Print every command line and its captured output.
debug = false

# Arguments placed before all others on every convert command line,
# e.g. "-limit memory 256MiB".
prepend = ""

# Output quality (0 = worst, 100 = best).
quality = 75

# Directory tools run from; relative paths resolve against it.
# Leave empty for the current directory.
working_dir = ""

# Kill a tool that runs longer than this many seconds.
# Omit or comment out for no limit.
# timeout_secs = 60

# Host path-restriction policy that may hide the executables, e.g. a list
# of allowed directories. Reported by `magick-exec check` when it fails.
# path_restriction = "/srv/www:/tmp"

# ---------------------------------------------------------------------------
# Post-processing applied to every convert
# ---------------------------------------------------------------------------
[advanced]
# Resample density to 72 pixels per inch. Pixel size is unchanged.
density = false

# Convert outputs to this colorspace: "RGB", "sRGB" or "GRAY".
# Leave empty to keep the source colorspace.
colorspace = ""

# Path to an ICC color profile all outputs are converted to.
# Overrides colorspace. Leave empty to disable.
profile = ""

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel tool invocations for `batch`.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
