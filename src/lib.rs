//! # Magick Exec
//!
//! Safe command-line execution of ImageMagick and GraphicsMagick.
//! Callers describe an image job as an [`exec::ArgumentSet`]; this crate turns
//! it into a single shell command line, runs it, and tells you what happened.
//!
//! # Architecture: One Child Process per Call
//!
//! Every call goes through the same pipeline:
//!
//! ```text
//! 1. Alter     ArgumentSet  →  ArgumentSet   (hooks, on a copy)
//! 2. Escape    paths        →  shell words   (POSIX sh or Windows cmd)
//! 3. Build     tool grammar →  command line  (identify, convert, gm convert)
//! 4. Run       command line →  exit status + captured stdout/stderr
//! 5. Classify  exit status  →  ExecOutput or ExecError
//! ```
//!
//! Paths are the only caller-controlled data that reach the shell, and they are
//! always escaped at build time. Option tokens are passed through verbatim
//! unless added with [`exec::ArgumentSet::add_quoted`].
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`exec`] | Argument sets, escaping, command-line grammar, process runner, execution manager |
//! | [`imaging`] | Identify and convert on top of [`exec`], post-processing, rotated bounding boxes |
//! | [`batch`] | Parallel conversion of a directory tree |
//! | [`config`] | `magick.toml` loading, merging and validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Shell Command Lines, Not argv
//!
//! The suites are driven through `sh -c` (or `cmd /C` on Windows) with one
//! pre-built command line. That line is what gets logged, what appears in
//! errors, and what a user can paste into a terminal to reproduce a failure.
//!
//! ## Failures Are Values
//!
//! A non-zero exit is an [`exec::ExecError::Execution`] carrying the code, the
//! trimmed stderr (or a fixed placeholder when stderr is empty) and the command
//! line. A binary that cannot be started is a distinct
//! [`exec::ExecError::Spawn`]. The installation check
//! [`exec::ExecManager::check_path`] never errors and returns readable
//! diagnostics instead.
//!
//! ## Pluggable Executor
//!
//! [`exec::ProcessExecutor`] is the seam between command-line construction and
//! the operating system. Everything above it can be tested without the suites
//! installed.

pub mod batch;
pub mod config;
pub mod exec;
pub mod imaging;
pub mod output;
