mod command;
mod options;

pub use command::{Capture, Cmd, Input, Output, PipeCmd, PipeCmdList};
pub use options::{ExecOptions, ExecType, ExternalExecOptions, OsExecOptions};
