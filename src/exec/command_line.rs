//! Per-tool command-line grammar.
//!
//! ```text
//! identify  <tokens...> <source><frames>
//! convert   <source><frames> <tokens...> [<format>:]<destination>
//! gm        convert <tokens...> <source><frames> <destination>
//! ```
//!
//! Source and destination are escaped here, with the frame selector joined to
//! the source path *before* escaping so the pair stays a single shell word.
//! A missing path leaves an empty slot; the shells collapse the extra space.
//! A path that is not valid UTF-8 is rejected rather than rewritten, since a
//! substituted byte would name a different file.

use super::arguments::{ArgumentSet, Token};
use super::error::ExecError;
use super::escape::EscapeContext;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Graphics suite providing the binaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Package {
    #[default]
    ImageMagick,
    GraphicsMagick,
}

impl Package {
    pub fn label(self) -> &'static str {
        match self {
            Package::ImageMagick => "ImageMagick",
            Package::GraphicsMagick => "GraphicsMagick",
        }
    }

    /// The tool that converts images for this suite.
    pub fn convert_tool(self) -> Tool {
        match self {
            Package::ImageMagick => Tool::Convert,
            Package::GraphicsMagick => Tool::Gm,
        }
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Tool personality; each has a fixed argument-order grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    Identify,
    Convert,
    Gm,
}

impl Tool {
    /// Executable base name, without platform suffix.
    pub fn executable_name(self) -> &'static str {
        match self {
            Tool::Identify => "identify",
            Tool::Convert => "convert",
            Tool::Gm => "gm",
        }
    }

    /// Builds the argument portion of the command line (everything after the binary).
    pub fn build(self, args: &ArgumentSet, ctx: &EscapeContext) -> Result<String, ExecError> {
        let tokens = join_tokens(args.tokens(), ctx);
        let source = escaped_source(args, ctx)?;
        let line = match self {
            Tool::Identify => format!("{tokens} {source}"),
            Tool::Convert => {
                let destination = match (escaped_destination(args, ctx)?, args.destination_format())
                {
                    (dest, Some(format)) if !dest.is_empty() => format!("{format}:{dest}"),
                    (dest, _) => dest,
                };
                format!("{source} {tokens} {destination}")
            }
            Tool::Gm => {
                let destination = escaped_destination(args, ctx)?;
                format!("convert {tokens} {source} {destination}")
            }
        };
        Ok(line)
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.executable_name())
    }
}

fn join_tokens(tokens: &[Token], ctx: &EscapeContext) -> String {
    tokens
        .iter()
        .map(|token| match token {
            Token::Raw(s) => s.clone(),
            Token::Quoted(s) => ctx.escape(s),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// The exact text of `path`, or [`ExecError::NonUnicodePath`].
pub fn path_text(path: &Path) -> Result<&str, ExecError> {
    path.to_str().ok_or_else(|| ExecError::NonUnicodePath {
        path: path.to_path_buf(),
    })
}

fn escaped_source(args: &ArgumentSet, ctx: &EscapeContext) -> Result<String, ExecError> {
    let Some(path) = args.source() else {
        return Ok(String::new());
    };
    let mut raw = path_text(path)?.to_string();
    if let Some(frames) = args.source_frames() {
        raw.push_str(frames);
    }
    Ok(ctx.escape(&raw))
}

fn escaped_destination(args: &ArgumentSet, ctx: &EscapeContext) -> Result<String, ExecError> {
    match args.destination() {
        Some(path) => Ok(ctx.escape(path_text(path)?)),
        None => Ok(String::new()),
    }
}
