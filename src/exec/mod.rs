//! External tool execution core.
//!
//! | Module | Responsibility |
//! |---|---|
//! | [`arguments`] | ordered tokens plus source/destination metadata |
//! | [`escape`] | shell quoting for POSIX `sh` and Windows `cmd` |
//! | [`locale`] | serialized `LC_CTYPE` swaps around escaping |
//! | [`command_line`] | per-tool argument order (`identify`, `convert`, `gm`) |
//! | [`runner`] | child process spawning and stream capture |
//! | [`manager`] | binary resolution, classification, installation check |
//! | [`error`] | error taxonomy |

pub mod arguments;
pub mod command_line;
pub mod error;
pub mod escape;
pub mod locale;
pub mod manager;
pub mod runner;

pub use arguments::{ArgumentSet, Token};
pub use command_line::{Package, Tool};
pub use error::{ExecError, NO_ERROR_MESSAGE};
pub use escape::{EscapeContext, ShellFlavor};
pub use manager::{
    AlterHook, ExecEvent, ExecManager, ExecOutput, ExecSettings, PathCheck, binary_path,
};
pub use runner::{Invocation, ProcessExecutor, ProcessOutput, RunError, SystemExecutor};
