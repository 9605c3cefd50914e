//! Error taxonomy for building and running suite command lines.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Placeholder used when a failing tool wrote nothing to stderr.
pub const NO_ERROR_MESSAGE: &str = "No error message.";

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("The {suite} executable {} does not exist.", .path.display())]
    BinaryNotFound { suite: String, path: PathBuf },
    #[error("The {suite} file {} is not executable.", .path.display())]
    NotExecutable { suite: String, path: PathBuf },
    #[error("Path is not valid UTF-8 and cannot be passed to the shell: {}", .path.display())]
    NonUnicodePath { path: PathBuf },
    #[error("Could not start {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{suite} error {code}: {error} [command: {command_line}]")]
    Execution {
        suite: String,
        code: i32,
        error: String,
        command_line: String,
    },
    #[error("{suite} was terminated by a signal [command: {command_line}]")]
    Terminated { suite: String, command_line: String },
    #[error("{suite} timed out after {timeout:?} [command: {command_line}]")]
    TimedOut {
        suite: String,
        timeout: Duration,
        command_line: String,
    },
    #[error("Could not parse {tool} output: {reason}")]
    OutputParse { tool: &'static str, reason: String },
    #[error("{suite} reported success but did not create {}", .path.display())]
    OutputMissing { suite: String, path: PathBuf },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExecError {
    /// Exit code of a completed process, if the error carries one.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ExecError::Execution { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// True when the binary could not be started at all.
    pub fn is_spawn_failure(&self) -> bool {
        matches!(self, ExecError::Spawn { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_message_carries_context() {
        let err = ExecError::Execution {
            suite: "ImageMagick".into(),
            code: 1,
            error: "no decode delegate".into(),
            command_line: "convert 'a.xyz' 'b.png'".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("ImageMagick error 1"));
        assert!(msg.contains("no decode delegate"));
        assert!(msg.contains("convert 'a.xyz' 'b.png'"));
        assert_eq!(err.exit_code(), Some(1));
    }

    #[test]
    fn spawn_failure_has_no_exit_code() {
        let err = ExecError::Spawn {
            program: "/nope/convert".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(err.is_spawn_failure());
        assert_eq!(err.exit_code(), None);
    }

    #[test]
    fn non_unicode_path_message_names_the_path() {
        let err = ExecError::NonUnicodePath {
            path: "/tmp/a.png".into(),
        };
        assert!(err.to_string().ends_with("/tmp/a.png"));
        assert_eq!(err.exit_code(), None);
        assert!(!err.is_spawn_failure());
    }

    #[test]
    fn configuration_messages() {
        let err = ExecError::BinaryNotFound {
            suite: "GraphicsMagick".into(),
            path: "/opt/gm/gm".into(),
        };
        assert_eq!(
            err.to_string(),
            "The GraphicsMagick executable /opt/gm/gm does not exist."
        );
    }
}
