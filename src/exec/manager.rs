//! Execution orchestration.
//!
//! [`ExecManager::execute`] turns a tool and an [`ArgumentSet`] into a single
//! child process:
//!
//! 1. resolve the binary (explicit override or configured directory + tool name)
//! 2. run the alter hooks on a working copy of the arguments
//! 3. escape paths and build the command line for the tool's grammar
//! 4. wrap it for the host shell and hand it to the [`ProcessExecutor`]
//! 5. classify the outcome into [`ExecOutput`] or an [`ExecError`]
//!
//! [`ExecManager::check_path`] is the installation check; it never fails and
//! reports every problem as a readable diagnostic.

use super::arguments::ArgumentSet;
use super::command_line::{Package, Tool, path_text};
use super::error::{ExecError, NO_ERROR_MESSAGE};
use super::escape::{EscapeContext, ShellFlavor};
use super::runner::{Invocation, ProcessExecutor, RunError, SystemExecutor};
use crate::config::MagickConfig;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::time::Duration;

/// Middleware run over the arguments before every command line is built.
pub type AlterHook = Box<dyn Fn(&mut ArgumentSet, Tool) + Send + Sync>;

/// Runtime settings derived from [`MagickConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecSettings {
    pub package: Package,
    /// Empty means the executables are looked up on `PATH`.
    pub binaries_dir: PathBuf,
    pub locale: Option<String>,
    pub debug: bool,
    pub working_dir: PathBuf,
    pub timeout: Option<Duration>,
    pub path_restriction: Option<String>,
    pub flavor: ShellFlavor,
}

impl ExecSettings {
    pub fn from_config(config: &MagickConfig) -> Self {
        let working_dir = if config.working_dir.as_os_str().is_empty() {
            std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
        } else {
            config.working_dir.clone()
        };
        Self {
            package: config.binaries,
            binaries_dir: config.path_to_binaries.clone(),
            locale: config.escape_locale().map(str::to_string),
            debug: config.debug,
            working_dir,
            timeout: config.timeout_secs.map(Duration::from_secs),
            path_restriction: config.path_restriction.clone(),
            flavor: ShellFlavor::native(),
        }
    }

    pub fn escape_context(&self) -> EscapeContext {
        EscapeContext::new(self.flavor, self.locale.clone())
    }
}

impl Default for ExecSettings {
    fn default() -> Self {
        Self::from_config(&MagickConfig::default())
    }
}

/// Captured output of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    /// The complete command line that was executed.
    pub command_line: String,
}

/// Diagnostic record sent for every completed run while debug is enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecEvent {
    pub suite: &'static str,
    pub command_line: String,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

/// Result of [`ExecManager::check_path`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathCheck {
    /// Version text printed by the binary.
    pub output: String,
    /// Diagnostics in the order they were found; empty on success.
    pub errors: Vec<String>,
}

impl PathCheck {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Full path of `tool` inside `dir`, with the platform executable suffix.
pub fn binary_path(dir: &Path, tool: Tool, flavor: ShellFlavor) -> PathBuf {
    dir.join(format!(
        "{}{}",
        tool.executable_name(),
        flavor.executable_suffix()
    ))
}

pub struct ExecManager<E: ProcessExecutor = SystemExecutor> {
    settings: ExecSettings,
    executor: E,
    hooks: Vec<AlterHook>,
    events: Option<Sender<ExecEvent>>,
}

impl ExecManager<SystemExecutor> {
    pub fn new(settings: ExecSettings) -> Self {
        Self::with_executor(settings, SystemExecutor)
    }
}

impl<E: ProcessExecutor> ExecManager<E> {
    pub fn with_executor(settings: ExecSettings, executor: E) -> Self {
        Self {
            settings,
            executor,
            hooks: Vec::new(),
            events: None,
        }
    }

    pub fn settings(&self) -> &ExecSettings {
        &self.settings
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Appends an alter hook; hooks run in registration order.
    pub fn add_hook(
        &mut self,
        hook: impl Fn(&mut ArgumentSet, Tool) + Send + Sync + 'static,
    ) -> &mut Self {
        self.hooks.push(Box::new(hook));
        self
    }

    /// Sends an [`ExecEvent`] per run to `tx` while debug is enabled.
    pub fn set_event_sender(&mut self, tx: Sender<ExecEvent>) -> &mut Self {
        self.events = Some(tx);
        self
    }

    pub fn suite(&self) -> &'static str {
        self.settings.package.label()
    }

    /// Configured path of `tool`.
    pub fn binary_path(&self, tool: Tool) -> PathBuf {
        binary_path(&self.settings.binaries_dir, tool, self.settings.flavor)
    }

    /// Builds the complete shell command line for running `binary`.
    ///
    /// Hooks are not applied here; [`execute`](Self::execute) runs them first.
    pub fn command_line(
        &self,
        tool: Tool,
        args: &ArgumentSet,
        binary: &Path,
    ) -> Result<String, ExecError> {
        let ctx = self.settings.escape_context();
        let program = ctx.escape(path_text(binary)?);
        let arguments = tool.build(args, &ctx)?;
        let line = match self.settings.flavor {
            ShellFlavor::Posix => format!("{program} {arguments}"),
            ShellFlavor::Windows => format!(
                "start \"{}\" /D {} /B /WAIT {program} {arguments}",
                self.suite(),
                ctx.escape(path_text(&self.settings.working_dir)?),
            ),
        };
        Ok(line)
    }

    /// Runs `tool` with `args`.
    ///
    /// `binary` overrides the configured binary path. The caller's argument
    /// set is never modified; hooks see a copy.
    pub fn execute(
        &self,
        tool: Tool,
        args: &ArgumentSet,
        binary: Option<&Path>,
    ) -> Result<ExecOutput, ExecError> {
        self.execute_as(self.settings.package, tool, args, binary)
    }

    fn execute_as(
        &self,
        package: Package,
        tool: Tool,
        args: &ArgumentSet,
        binary: Option<&Path>,
    ) -> Result<ExecOutput, ExecError> {
        let suite = package.label();
        let program = binary
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.binary_path(tool));

        let mut working = args.clone();
        for hook in &self.hooks {
            hook(&mut working, tool);
        }
        let command_line = self
            .command_line(tool, &working, &program)
            .inspect_err(|e| tracing::error!(suite, error = %e, "could not build command line"))?;
        tracing::debug!(suite, command = %command_line, "running");

        let invocation = Invocation {
            program,
            command_line,
            working_dir: self.settings.working_dir.clone(),
            flavor: self.settings.flavor,
            timeout: self.settings.timeout,
        };
        let output = match self.executor.run(&invocation) {
            Ok(output) => output,
            Err(RunError::Spawn { program, source }) => {
                tracing::error!(suite, command = %invocation.command_line, error = %source, "could not start");
                return Err(ExecError::Spawn { program, source });
            }
            Err(RunError::TimedOut(timeout)) => {
                tracing::error!(suite, command = %invocation.command_line, ?timeout, "timed out");
                return Err(ExecError::TimedOut {
                    suite: suite.to_string(),
                    timeout,
                    command_line: invocation.command_line,
                });
            }
            Err(RunError::Io(e)) => return Err(ExecError::Io(e)),
        };

        self.emit(ExecEvent {
            suite,
            command_line: invocation.command_line.clone(),
            stdout: output.stdout.clone(),
            stderr: output.stderr.clone(),
            exit_code: output.exit_code,
        });

        match output.exit_code {
            Some(0) => Ok(ExecOutput {
                stdout: output.stdout,
                stderr: output.stderr,
                command_line: invocation.command_line,
            }),
            Some(code) => {
                let error = if output.stderr.trim().is_empty() {
                    tracing::warn!(suite, code, command = %invocation.command_line, "non-zero exit without error output");
                    NO_ERROR_MESSAGE.to_string()
                } else {
                    let error = output.stderr.trim_end().to_string();
                    tracing::error!(suite, code, error = %error, command = %invocation.command_line, "tool failed");
                    error
                };
                Err(ExecError::Execution {
                    suite: suite.to_string(),
                    code,
                    error,
                    command_line: invocation.command_line,
                })
            }
            None => {
                tracing::error!(suite, command = %invocation.command_line, "terminated by signal");
                Err(ExecError::Terminated {
                    suite: suite.to_string(),
                    command_line: invocation.command_line,
                })
            }
        }
    }

    fn emit(&self, event: ExecEvent) {
        if !self.settings.debug {
            return;
        }
        if let Some(tx) = &self.events {
            // A dropped receiver just means nobody is listening any more.
            let _ = tx.send(event);
        }
    }

    /// Verifies that the suite's convert-style binary in `dir` is usable.
    ///
    /// An empty `dir` skips the file checks and resolves the binary on `PATH`.
    /// `package` defaults to the configured suite. Every failure is returned
    /// as a diagnostic string; this never errors.
    pub fn check_path(&self, dir: &Path, package: Option<Package>) -> PathCheck {
        let package = package.unwrap_or(self.settings.package);
        let suite = package.label();
        let tool = package.convert_tool();
        let binary = binary_path(dir, tool, self.settings.flavor);
        let mut check = PathCheck::default();

        if !dir.as_os_str().is_empty() {
            if !binary.is_file() {
                check.errors.push(
                    ExecError::BinaryNotFound {
                        suite: suite.to_string(),
                        path: binary.clone(),
                    }
                    .to_string(),
                );
            } else if !is_executable(&binary) {
                check.errors.push(
                    ExecError::NotExecutable {
                        suite: suite.to_string(),
                        path: binary.clone(),
                    }
                    .to_string(),
                );
            }
        }

        if !check.errors.is_empty() {
            if let Some(policy) = &self.settings.path_restriction {
                check.errors.push(format!(
                    "The host path restriction is set to {policy}, which may prevent locating the {suite} executable."
                ));
            }
            return check;
        }

        let mut args = ArgumentSet::new();
        args.add("-version");
        match self.execute_as(package, tool, &args, Some(&binary)) {
            Ok(out) => {
                check.output = out.stdout;
                if !out.stderr.trim().is_empty() {
                    check.errors.push(out.stderr.trim_end().to_string());
                }
            }
            Err(e) => check.errors.push(e.to_string()),
        }
        check
    }

    /// Output of `locale -a` on POSIX hosts.
    pub fn installed_locales(&self) -> Result<String, ExecError> {
        if self.settings.flavor == ShellFlavor::Windows {
            return Ok("List not available on Windows servers.".to_string());
        }
        let invocation = Invocation {
            program: PathBuf::from("locale"),
            command_line: "locale -a".to_string(),
            working_dir: self.settings.working_dir.clone(),
            flavor: self.settings.flavor,
            timeout: self.settings.timeout,
        };
        let output = self.executor.run(&invocation).map_err(|e| match e {
            RunError::Spawn { program, source } => ExecError::Spawn { program, source },
            RunError::TimedOut(timeout) => ExecError::TimedOut {
                suite: "locale".to_string(),
                timeout,
                command_line: invocation.command_line.clone(),
            },
            RunError::Io(e) => ExecError::Io(e),
        })?;
        match output.exit_code {
            Some(0) => Ok(output.stdout),
            code => Err(ExecError::Execution {
                suite: "locale".to_string(),
                code: code.unwrap_or(-1),
                error: if output.stderr.trim().is_empty() {
                    NO_ERROR_MESSAGE.to_string()
                } else {
                    output.stderr.trim_end().to_string()
                },
                command_line: invocation.command_line,
            }),
        }
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
