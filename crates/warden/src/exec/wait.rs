use super::stdio::{self, Feeder, Sink};
use nix::sys::signal::Signal;
use std::os::fd::OwnedFd;
use std::os::unix::process::ExitStatusExt;
use std::process::{Child, ExitStatus};
use warden_core::{Error, Result};

/// Deferred completion of a started command or pipeline.
///
/// Returned by `execute` and `execute_piped` once every process has been
/// started. A failure to start is carried here too and reported by
/// [`Wait::wait`], so callers always go through the same two steps.
#[must_use = "processes keep running until waited on"]
pub struct Wait {
    state: State,
}

enum State {
    Failed(Error),
    Running(Running),
}

impl Wait {
    pub(crate) fn failed(error: Error) -> Self {
        Self {
            state: State::Failed(error),
        }
    }

    pub(crate) fn running(running: Running) -> Self {
        Self {
            state: State::Running(running),
        }
    }

    /// Blocks until every process has exited.
    pub fn wait(self) -> Result<()> {
        match self.state {
            State::Failed(error) => Err(error),
            State::Running(running) => running.wait(),
        }
    }

    /// Runs [`Wait::wait`] on tokio's blocking pool.
    ///
    /// Dropping the returned future does not stop the processes.
    #[cfg(feature = "tokio")]
    pub async fn wait_async(self) -> Result<()> {
        tokio::task::spawn_blocking(move || self.wait())
            .await
            .map_err(|e| Error::Io(std::io::Error::other(e)))?
    }
}

impl std::fmt::Debug for Wait {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.state {
            State::Failed(error) => f.debug_tuple("Wait::Failed").field(error).finish(),
            State::Running(running) => f
                .debug_struct("Wait::Running")
                .field("stages", &running.stages.len())
                .finish(),
        }
    }
}

pub(crate) struct Stage {
    pub(crate) program: String,
    pub(crate) child: Child,
}

impl Stage {
    /// Waits for the process. A stage feeding another one may be stopped by
    /// `SIGPIPE` when its consumer exits first, which counts as success.
    fn wait(&mut self, feeds_next: bool) -> Result<()> {
        let status = self.child.wait()?;
        if status.success() || (feeds_next && is_broken_pipe(status)) {
            Ok(())
        } else {
            Err(Error::ExitStatus {
                program: self.program.clone(),
                status,
            })
        }
    }
}

fn is_broken_pipe(status: ExitStatus) -> bool {
    status.signal() == Some(Signal::SIGPIPE as i32)
}

/// Started processes plus the parent's copies of everything wired to them.
///
/// `readers[i]` and `writers[i]` are the two ends of the pipe between stage
/// `i` and stage `i + 1`. A reader is only held until stage `i + 1` has been
/// spawned; writers are held until their stage has been waited on.
pub(crate) struct Running {
    pub(crate) stages: Vec<Stage>,
    pub(crate) readers: Vec<Option<OwnedFd>>,
    pub(crate) writers: Vec<Option<OwnedFd>>,
    pub(crate) feeder: Feeder,
    pub(crate) stdout: Sink,
    pub(crate) stderr: Sink,
}

impl Running {
    fn wait(mut self) -> Result<()> {
        let mut first: Option<Error> = None;
        let last = self.stages.len().saturating_sub(1);

        for (i, stage) in self.stages.iter_mut().enumerate() {
            keep_first(&mut first, stage.wait(i < last));
            if i < last {
                keep_first(&mut first, stdio::close(self.writers[i].take()));
            }
        }
        tracing::debug!(stages = self.stages.len(), "processes exited");

        keep_first(&mut first, self.feeder.finish());
        keep_first(&mut first, self.stdout.finish());
        keep_first(&mut first, self.stderr.finish());

        match first {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Stops everything started so far after a later stage failed to start.
    pub(crate) fn abort(mut self) {
        for stage in &mut self.stages {
            if let Err(e) = stage.child.kill() {
                tracing::debug!("failed to kill '{}': {}", stage.program, e);
            }
        }
        // Exit statuses are irrelevant here; the spawn error is what the
        // caller sees.
        if let Err(e) = self.wait() {
            tracing::debug!("aborted pipeline: {}", e);
        }
    }
}

fn keep_first(first: &mut Option<Error>, result: Result<()>) {
    if let Err(e) = result {
        if first.is_none() {
            *first = Some(e);
        } else {
            tracing::debug!("suppressed later pipeline error: {}", e);
        }
    }
}
