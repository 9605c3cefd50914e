//! High-level identify and convert operations.
//!
//! These functions combine an [`ArgumentSet`] built by the caller with the
//! configured post-processing, run it through the [`ExecManager`], and
//! interpret the result.

use super::identify::{IDENTIFY_FORMAT, ImageInfo, parse_identify_output};
use super::params::PostProcessing;
use crate::config::MagickConfig;
use crate::exec::{
    ArgumentSet, ExecError, ExecManager, ExecOutput, ExecSettings, ProcessExecutor,
    SystemExecutor, Tool,
};
use std::path::{Path, PathBuf};

pub struct MagickToolkit<E: ProcessExecutor = SystemExecutor> {
    manager: ExecManager<E>,
    post: PostProcessing,
}

impl MagickToolkit<SystemExecutor> {
    pub fn from_config(config: &MagickConfig) -> Self {
        Self::new(
            ExecManager::new(ExecSettings::from_config(config)),
            PostProcessing::from_config(config),
        )
    }
}

impl<E: ProcessExecutor> MagickToolkit<E> {
    pub fn new(manager: ExecManager<E>, post: PostProcessing) -> Self {
        Self { manager, post }
    }

    pub fn manager(&self) -> &ExecManager<E> {
        &self.manager
    }

    /// Mutable access for registering hooks and the debug channel.
    pub fn manager_mut(&mut self) -> &mut ExecManager<E> {
        &mut self.manager
    }

    pub fn post_processing(&self) -> &PostProcessing {
        &self.post
    }

    /// Identifies the file at `path`.
    pub fn identify(&self, path: &Path) -> Result<ImageInfo, ExecError> {
        let mut args = ArgumentSet::new();
        args.set_source(path);
        self.identify_with(&args)
    }

    /// Identifies the source of `args`, honouring its frame selector.
    ///
    /// `args` is left untouched so it can be reused for a following convert.
    pub fn identify_with(&self, args: &ArgumentSet) -> Result<ImageInfo, ExecError> {
        let mut query = args.clone();
        query.reset().add("-format").add_quoted(IDENTIFY_FORMAT);
        let output = self.manager.execute(Tool::Identify, &query, None)?;
        let path = args.source().map(Path::to_path_buf).unwrap_or_default();
        parse_identify_output(&output.stdout)
            .and_then(|frames| ImageInfo::from_frames(path, frames))
            .inspect_err(|e| {
                tracing::error!(
                    suite = self.manager.suite(),
                    command = %output.command_line,
                    error = %e,
                    "could not parse identify output"
                );
            })
    }

    /// Converts `args.source()` into `args.destination()`.
    ///
    /// Post-processing arguments are added to a copy of `args`. Succeeds only
    /// if the tool exits cleanly and the destination file exists afterwards.
    pub fn convert(&self, args: &ArgumentSet) -> Result<ExecOutput, ExecError> {
        let mut job = args.clone();
        self.post.apply(&mut job);
        let tool = self.manager.settings().package.convert_tool();
        let output = self.manager.execute(tool, &job, None)?;

        if let Some(destination) = args.destination() {
            let written = self.resolve(destination);
            if !written.exists() {
                tracing::error!(
                    suite = self.manager.suite(),
                    command = %output.command_line,
                    path = %written.display(),
                    "destination was not created"
                );
                return Err(ExecError::OutputMissing {
                    suite: self.manager.suite().to_string(),
                    path: written,
                });
            }
        }
        Ok(output)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.manager.settings().working_dir.join(path)
        }
    }
}
