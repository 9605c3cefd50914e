//! Parallel conversion of a directory tree.
//!
//! [`plan`] walks a source directory and pairs every supported image with a
//! destination path that mirrors its relative location:
//!
//! ```text
//! photos/2024/a.png   →  out/2024/a.jpg
//! photos/b.gif        →  out/b.jpg
//! ```
//!
//! Two sources that would land on the same destination (`a.png` and `a.gif`
//! both becoming `a.jpg`) are rejected by [`plan`] before anything runs.
//!
//! [`run`] converts the plan on the rayon pool. One failing file never stops
//! the others; each outcome records its own error.

use crate::exec::{ArgumentSet, ProcessExecutor};
use crate::imaging::{MagickToolkit, is_supported_format};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Source is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),
    #[error(
        "{} and {} would both be written to {}",
        .first.display(),
        .second.display(),
        .destination.display()
    )]
    DuplicateDestination {
        destination: PathBuf,
        first: PathBuf,
        second: PathBuf,
    },
}

/// One file to convert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchJob {
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// What happened to one [`BatchJob`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub job: BatchJob,
    pub error: Option<String>,
}

impl BatchOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Lists supported images under `source_dir`, sorted by path, with their
/// destinations under `dest_dir` using the `format` extension.
///
/// Fails with [`BatchError::DuplicateDestination`] when two sources differ
/// only by extension.
pub fn plan(source_dir: &Path, dest_dir: &Path, format: &str) -> Result<Vec<BatchJob>, BatchError> {
    let format = format.to_ascii_lowercase();
    if !is_supported_format(&format) {
        return Err(BatchError::UnsupportedFormat(format));
    }
    if !source_dir.is_dir() {
        return Err(BatchError::NotADirectory(source_dir.to_path_buf()));
    }

    let mut jobs = Vec::new();
    let mut claimed: HashMap<PathBuf, PathBuf> = HashMap::new();
    for entry in WalkDir::new(source_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let supported = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(is_supported_format);
        if !supported {
            continue;
        }
        let Ok(relative) = path.strip_prefix(source_dir) else {
            continue;
        };
        let destination = dest_dir.join(relative).with_extension(&format);
        if let Some(first) = claimed.insert(destination.clone(), path.to_path_buf()) {
            return Err(BatchError::DuplicateDestination {
                destination,
                first,
                second: path.to_path_buf(),
            });
        }
        jobs.push(BatchJob {
            source: path.to_path_buf(),
            destination,
        });
    }
    Ok(jobs)
}

/// Converts every job in parallel, returning outcomes in job order.
///
/// `tool_args` are added, quoted, to each command line before post-processing.
pub fn run<E: ProcessExecutor>(
    toolkit: &MagickToolkit<E>,
    jobs: &[BatchJob],
    format: &str,
    tool_args: &[String],
) -> Vec<BatchOutcome> {
    jobs.par_iter()
        .map(|job| BatchOutcome {
            job: job.clone(),
            error: convert_one(toolkit, job, format, tool_args)
                .err()
                .map(|e| e.to_string()),
        })
        .collect()
}

fn convert_one<E: ProcessExecutor>(
    toolkit: &MagickToolkit<E>,
    job: &BatchJob,
    format: &str,
    tool_args: &[String],
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if let Some(parent) = job.destination.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut args = ArgumentSet::new();
    args.set_source(&job.source)
        .set_destination(&job.destination)
        .set_destination_format(format.to_ascii_lowercase());
    for arg in tool_args {
        args.add_quoted(arg.as_str());
    }
    toolkit.convert(&args)?;
    Ok(())
}
