//! Command-line arguments for one tool invocation.
//!
//! An [`ArgumentSet`] holds the ordered tokens that go between the tool name
//! and its file operands, plus the source/destination metadata the
//! [command-line builder](super::command_line) places according to each tool's
//! grammar.
//!
//! Tokens are stored unescaped so they stay introspectable: callers can
//! [`find`](ArgumentSet::find) and [`remove`](ArgumentSet::remove) them by
//! prefix. Values that may carry shell metacharacters are added with
//! [`add_quoted`](ArgumentSet::add_quoted) and are only escaped when the
//! command line is built.

use std::path::{Path, PathBuf};

/// A single command-line token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Emitted verbatim, e.g. `-resize` or `50%`.
    Raw(String),
    /// Escaped for the target shell at build time, e.g. a `-format` string.
    Quoted(String),
}

impl Token {
    /// The unescaped text of the token.
    pub fn as_str(&self) -> &str {
        match self {
            Token::Raw(s) | Token::Quoted(s) => s,
        }
    }
}

/// Ordered arguments plus file operands for an `identify`, `convert` or `gm` run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgumentSet {
    tokens: Vec<Token>,
    source: Option<PathBuf>,
    source_frames: Option<String>,
    destination: Option<PathBuf>,
    destination_format: Option<String>,
}

impl ArgumentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a token that is emitted verbatim.
    pub fn add(&mut self, arg: impl Into<String>) -> &mut Self {
        self.tokens.push(Token::Raw(arg.into()));
        self
    }

    /// Appends a value that is shell-escaped when the command line is built.
    pub fn add_quoted(&mut self, value: impl Into<String>) -> &mut Self {
        self.tokens.push(Token::Quoted(value.into()));
        self
    }

    /// Inserts a verbatim token in front of all others.
    pub fn prepend(&mut self, arg: impl Into<String>) -> &mut Self {
        self.tokens.insert(0, Token::Raw(arg.into()));
        self
    }

    /// Index of the first token starting with `prefix`.
    pub fn find(&self, prefix: &str) -> Option<usize> {
        self.tokens
            .iter()
            .position(|t| t.as_str().starts_with(prefix))
    }

    /// Removes the token at `index`, if present.
    pub fn remove(&mut self, index: usize) -> Option<Token> {
        (index < self.tokens.len()).then(|| self.tokens.remove(index))
    }

    pub fn reset(&mut self) -> &mut Self {
        self.tokens.clear();
        self
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn set_source(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.source = Some(path.into());
        self
    }

    /// Frame selector appended to the source path, e.g. `[0]`.
    pub fn source_frames(&self) -> Option<&str> {
        self.source_frames.as_deref()
    }

    pub fn set_source_frames(&mut self, selector: impl Into<String>) -> &mut Self {
        self.source_frames = Some(selector.into());
        self
    }

    pub fn destination(&self) -> Option<&Path> {
        self.destination.as_deref()
    }

    pub fn set_destination(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.destination = Some(path.into());
        self
    }

    pub fn clear_destination(&mut self) -> &mut Self {
        self.destination = None;
        self
    }

    /// Output format prefixed to the destination as `<format>:<path>`.
    pub fn destination_format(&self) -> Option<&str> {
        self.destination_format.as_deref()
    }

    pub fn set_destination_format(&mut self, format: impl Into<String>) -> &mut Self {
        let format = format.into();
        self.destination_format = (!format.is_empty()).then_some(format);
        self
    }
}
