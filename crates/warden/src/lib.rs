//! Guarded sandbox directories and piped process execution.
//!
//! Every handle warden gives out owns a lifecycle [`Guard`]: operations on
//! the handle are admitted by the guard, and destroying the handle waits for
//! admitted operations, destroys the handles derived from it, then removes
//! its directory.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use warden::{Capture, ClientProvider, Input, PipeCmd, PipeCmdList};
//!
//! # fn example() -> warden::Result<()> {
//! let provider = ClientProvider::os()?;
//! let client = provider.new_temp_dir_client()?;
//!
//! let stdout = Capture::new();
//! client
//!     .execute_piped(
//!         PipeCmdList::new([PipeCmd::new(["sort"]), PipeCmd::new(["uniq"])])
//!             .with_stdin(Input::bytes("b\na\nb\n"))
//!             .with_stdout(&stdout),
//!     )
//!     .wait()?;
//! assert_eq!(stdout.to_string_lossy(), "a\nb\n");
//!
//! provider.destroy()?;
//! # Ok(())
//! # }
//! ```

mod capability;
mod client;
mod exec;
mod provider;

// ============================================================================
// Core API
// ============================================================================

pub use client::Client;
pub use exec::Wait;
pub use provider::ClientProvider;

pub use capability::{
    Destroyable, DirectoryContext, Executable, ExecutorReadFileManager, ExecutorWriteFileManager,
    ReadWriteFileManager, Readable, SubdirectoryFactory, TempDirFactory, Writable,
};

// Command descriptors
pub use warden_core::{Capture, Cmd, Input, Output, PipeCmd, PipeCmdList};

// Executor configuration
pub use warden_core::{ExecOptions, ExecType, ExternalExecOptions, OsExecOptions};

pub use warden_core::path;
pub use warden_core::{Error, Guard, Result, Teardown};
