//! CLI output formatting for every command.
//!
//! # Output Format
//!
//! ## Check
//!
//! ```text
//! ImageMagick: OK
//!     Version: ImageMagick 6.9.12-98 Q16 x86_64
//!     Copyright: (C) 1999 ImageMagick Studio LLC
//! ```
//!
//! ```text
//! ImageMagick: path error
//!     1. The ImageMagick executable /opt/im/convert does not exist.
//!     2. The host path restriction is set to /srv, ...
//! ```
//!
//! ## Identify
//!
//! ```text
//! anim.gif
//!     GIF 40x20, 3 frames
//!     002 20x10
//!     003 10x5
//! ```
//!
//! ## Batch
//!
//! ```text
//! 001 photos/a.png → out/a.jpg
//! 002 photos/b.gif: FAILED ImageMagick error 1: ...
//!
//! Converted 1 of 2 images
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::batch::BatchOutcome;
use crate::exec::{ExecEvent, PathCheck};
use crate::imaging::ImageInfo;
use std::path::Path;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Indents every non-empty line of multi-line tool output.
fn indented_lines(text: &str, depth: usize) -> impl Iterator<Item = String> + '_ {
    let pad = indent(depth);
    text.lines()
        .filter(|l| !l.trim().is_empty())
        .map(move |l| format!("{pad}{}", l.trim_end()))
}

// ============================================================================
// check
// ============================================================================

pub fn format_check(suite: &str, check: &PathCheck) -> Vec<String> {
    if check.is_ok() {
        let mut lines = vec![format!("{suite}: OK")];
        lines.extend(indented_lines(&check.output, 1));
        lines
    } else {
        let mut lines = vec![format!("{suite}: path error")];
        lines.extend(
            check
                .errors
                .iter()
                .enumerate()
                .map(|(i, e)| format!("{}{}. {}", indent(1), i + 1, e.trim_end())),
        );
        lines
    }
}

pub fn print_check(suite: &str, check: &PathCheck) {
    for line in format_check(suite, check) {
        println!("{}", line);
    }
}

// ============================================================================
// identify
// ============================================================================

pub fn format_image_info(info: &ImageInfo) -> Vec<String> {
    let name = info
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| info.path.display().to_string());
    let mut summary = format!(
        "{}{} {}x{}",
        indent(1),
        info.format.to_ascii_uppercase(),
        info.width,
        info.height
    );
    if info.frame_count() > 1 {
        summary.push_str(&format!(", {} frames", info.frame_count()));
    }
    if let Some(orientation) = info.exif_orientation {
        summary.push_str(&format!(", EXIF orientation {orientation}"));
    }
    if !info.is_supported() {
        summary.push_str(" (unsupported)");
    }

    let mut lines = vec![name, summary];
    for (i, frame) in info.frames.iter().enumerate().skip(1) {
        lines.push(format!(
            "{}{} {}x{}",
            indent(1),
            format_index(i + 1),
            frame.width,
            frame.height
        ));
    }
    lines
}

pub fn print_image_info(info: &ImageInfo) {
    for line in format_image_info(info) {
        println!("{}", line);
    }
}

// ============================================================================
// convert / batch
// ============================================================================

pub fn format_convert(source: &Path, destination: &Path) -> String {
    format!("{} → {}", source.display(), destination.display())
}

pub fn format_batch(outcomes: &[BatchOutcome]) -> Vec<String> {
    let mut lines: Vec<String> = outcomes
        .iter()
        .enumerate()
        .map(|(i, o)| match &o.error {
            None => format!(
                "{} {}",
                format_index(i + 1),
                format_convert(&o.job.source, &o.job.destination)
            ),
            Some(e) => format!(
                "{} {}: FAILED {}",
                format_index(i + 1),
                o.job.source.display(),
                e
            ),
        })
        .collect();
    let converted = outcomes.iter().filter(|o| o.is_ok()).count();
    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format!(
        "Converted {} of {} images",
        converted,
        outcomes.len()
    ));
    lines
}

pub fn print_batch(outcomes: &[BatchOutcome]) {
    for line in format_batch(outcomes) {
        println!("{}", line);
    }
}

// ============================================================================
// rotate-box
// ============================================================================

pub fn format_rotation(width: u32, height: u32, angle: f64, bounds: (u32, u32)) -> String {
    format!(
        "{}x{} rotated {}° → {}x{}",
        width, height, angle, bounds.0, bounds.1
    )
}

// ============================================================================
// debug events
// ============================================================================

/// Lines for one [`ExecEvent`], printed while `debug` is enabled.
pub fn format_exec_event(event: &ExecEvent) -> Vec<String> {
    let mut lines = vec![format!("[{} command] {}", event.suite, event.command_line)];
    if !event.stdout.trim().is_empty() {
        lines.push(format!("{}{} output:", indent(1), event.suite));
        lines.extend(indented_lines(&event.stdout, 2));
    }
    if !event.stderr.trim().is_empty() {
        let code = event
            .exit_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string());
        lines.push(format!("{}{} error {}:", indent(1), event.suite, code));
        lines.extend(indented_lines(&event.stderr, 2));
    }
    lines
}
