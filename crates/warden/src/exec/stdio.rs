//! Standard stream plumbing for spawned processes.
//!
//! Pipes created here are close-on-exec so that a stage never inherits the
//! parent's copy of another stage's pipe; a leaked write end would keep the
//! reading stage from ever seeing end-of-file.

use nix::unistd;
use std::fs::File;
use std::io::{self, Read, Write};
use std::os::fd::{IntoRawFd, OwnedFd};
use std::process::{Child, Stdio};
use std::thread::{self, JoinHandle};
use warden_core::{Error, Input, Output, Result};

/// Creates an OS pipe, returning `(read, write)`.
pub(crate) fn pipe() -> Result<(OwnedFd, OwnedFd)> {
    #[cfg(not(target_vendor = "apple"))]
    {
        use nix::fcntl::OFlag;
        Ok(unistd::pipe2(OFlag::O_CLOEXEC).map_err(io::Error::from)?)
    }

    #[cfg(target_vendor = "apple")]
    {
        use nix::fcntl::{FcntlArg, FdFlag, fcntl};
        use std::os::fd::AsRawFd;

        let (read, write) = unistd::pipe().map_err(io::Error::from)?;
        for fd in [&read, &write] {
            fcntl(fd.as_raw_fd(), FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC))
                .map_err(io::Error::from)?;
        }
        Ok((read, write))
    }
}

/// Closes `fd`, reporting the error that dropping it would swallow.
pub(crate) fn close(fd: Option<OwnedFd>) -> Result<()> {
    match fd {
        Some(fd) => {
            unistd::close(fd.into_raw_fd()).map_err(io::Error::from)?;
            Ok(())
        }
        None => Ok(()),
    }
}

fn join(pump: JoinHandle<io::Result<()>>, what: &str) -> Result<()> {
    match pump.join() {
        Ok(result) => Ok(result?),
        Err(_) => Err(Error::Io(io::Error::other(format!("{what} thread panicked")))),
    }
}

enum Target {
    Null,
    Inherit,
    Fd(OwnedFd),
}

/// Destination for one output stream, shareable by several processes.
pub(crate) struct Sink {
    target: Target,
    pump: Option<JoinHandle<io::Result<()>>>,
}

impl Sink {
    pub(crate) fn open(output: Output) -> Result<Self> {
        match output {
            Output::Null => Ok(Self::direct(Target::Null)),
            Output::Inherit => Ok(Self::direct(Target::Inherit)),
            Output::File(file) => Ok(Self::direct(Target::Fd(OwnedFd::from(file)))),
            Output::Capture(capture) => Self::pumped(capture),
            Output::Writer(writer) => Self::pumped(writer),
        }
    }

    fn direct(target: Target) -> Self {
        Self { target, pump: None }
    }

    fn pumped<W>(mut writer: W) -> Result<Self>
    where
        W: Write + Send + 'static,
    {
        let (read, write) = pipe()?;
        let pump = thread::Builder::new()
            .name("warden-output".to_string())
            .spawn(move || {
                let mut reader = File::from(read);
                io::copy(&mut reader, &mut writer)?;
                writer.flush()
            })?;
        Ok(Self {
            target: Target::Fd(write),
            pump: Some(pump),
        })
    }

    /// A new handle to this sink for one child process.
    pub(crate) fn stdio(&self) -> Result<Stdio> {
        Ok(match &self.target {
            Target::Null => Stdio::null(),
            Target::Inherit => Stdio::inherit(),
            Target::Fd(fd) => Stdio::from(fd.try_clone()?),
        })
    }

    /// Closes the parent's end and waits until everything written has been
    /// copied out. Every process given a handle must have exited first.
    pub(crate) fn finish(self) -> Result<()> {
        let closed = match self.target {
            Target::Fd(fd) => close(Some(fd)),
            Target::Null | Target::Inherit => Ok(()),
        };
        let pumped = match self.pump {
            Some(pump) => join(pump, "output"),
            None => Ok(()),
        };
        closed.and(pumped)
    }
}

/// Origin of the first process' standard input.
pub(crate) struct Source {
    pending: Option<Box<dyn Read + Send>>,
}

impl Source {
    pub(crate) fn open(input: Input) -> (Stdio, Self) {
        let (stdio, pending) = match input {
            Input::Null => (Stdio::null(), None),
            Input::Inherit => (Stdio::inherit(), None),
            Input::File(file) => (Stdio::from(file), None),
            Input::Bytes(bytes) => (
                Stdio::piped(),
                Some(Box::new(io::Cursor::new(bytes)) as Box<dyn Read + Send>),
            ),
            Input::Reader(reader) => (Stdio::piped(), Some(reader)),
        };
        (stdio, Self { pending })
    }

    /// Starts copying pending input into `child`'s stdin.
    pub(crate) fn start(self, child: &mut Child) -> Result<Feeder> {
        let Some(mut reader) = self.pending else {
            return Ok(Feeder(None));
        };
        let Some(mut stdin) = child.stdin.take() else {
            return Ok(Feeder(None));
        };
        let feed = thread::Builder::new()
            .name("warden-input".to_string())
            .spawn(move || match io::copy(&mut reader, &mut stdin) {
                Ok(_) => Ok(()),
                // The process is not obliged to read all of its input.
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
                Err(e) => Err(e),
            })?;
        Ok(Feeder(Some(feed)))
    }
}

/// Running input copy started by [`Source::start`].
#[derive(Default)]
pub(crate) struct Feeder(Option<JoinHandle<io::Result<()>>>);

impl Feeder {
    pub(crate) fn finish(self) -> Result<()> {
        match self.0 {
            Some(feed) => join(feed, "input"),
            None => Ok(()),
        }
    }
}
