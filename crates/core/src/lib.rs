pub mod error;
pub mod guard;
pub mod path;
pub mod types;

pub use error::{Error, Result};
pub use guard::{Guard, Teardown};
pub use types::{
    Capture, Cmd, ExecOptions, ExecType, ExternalExecOptions, Input, OsExecOptions, Output,
    PipeCmd, PipeCmdList,
};
