use std::fmt;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Where a process reads its standard input from.
#[derive(Default)]
pub enum Input {
    /// Read from the null device.
    #[default]
    Null,
    /// Share the current process' standard input.
    Inherit,
    /// Feed these bytes, then close the stream.
    Bytes(Vec<u8>),
    /// Copy everything from a reader, then close the stream.
    Reader(Box<dyn Read + Send>),
    /// Read directly from a file.
    File(File),
}

impl Input {
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(bytes.into())
    }

    pub fn reader(reader: impl Read + Send + 'static) -> Self {
        Self::Reader(Box::new(reader))
    }
}

impl fmt::Debug for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Input::Null => f.write_str("Null"),
            Input::Inherit => f.write_str("Inherit"),
            Input::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Input::Reader(_) => f.write_str("Reader(..)"),
            Input::File(file) => f.debug_tuple("File").field(file).finish(),
        }
    }
}

/// Where a process writes one of its output streams.
#[derive(Default)]
pub enum Output {
    /// Discard the output.
    #[default]
    Null,
    /// Share the current process' stream.
    Inherit,
    /// Collect the output into a shared buffer.
    Capture(Capture),
    /// Copy the output into a writer.
    Writer(Box<dyn Write + Send>),
    /// Write directly to a file.
    File(File),
}

impl Output {
    pub fn writer(writer: impl Write + Send + 'static) -> Self {
        Self::Writer(Box::new(writer))
    }
}

impl From<Capture> for Output {
    fn from(capture: Capture) -> Self {
        Self::Capture(capture)
    }
}

impl From<&Capture> for Output {
    fn from(capture: &Capture) -> Self {
        Self::Capture(capture.clone())
    }
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Null => f.write_str("Null"),
            Output::Inherit => f.write_str("Inherit"),
            Output::Capture(capture) => f.debug_tuple("Capture").field(&capture.len()).finish(),
            Output::Writer(_) => f.write_str("Writer(..)"),
            Output::File(file) => f.debug_tuple("File").field(file).finish(),
        }
    }
}

/// Shared, cloneable buffer collecting process output.
///
/// All clones see the same bytes, so one clone can be handed to a command
/// while another is kept to read the result after waiting.
#[derive(Clone, Default)]
pub struct Capture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl Capture {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn contents(&self) -> Vec<u8> {
        self.lock().clone()
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.lock()).into_owned()
    }

    /// Captured output as text with surrounding whitespace removed.
    pub fn trimmed(&self) -> String {
        self.to_string_lossy().trim().to_string()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl fmt::Debug for Capture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capture").field("len", &self.len()).finish()
    }
}

/// One stage of a piped pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipeCmd {
    /// Program followed by its arguments.
    pub args: Vec<String>,
    /// Working directory relative to the handle's directory.
    pub sub_dir: Option<PathBuf>,
    /// Variables set on top of the environment.
    pub env: Vec<(String, String)>,
    /// Start from an empty environment instead of the inherited one.
    pub clear_env: bool,
}

impl PipeCmd {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_sub_dir(mut self, sub_dir: impl Into<PathBuf>) -> Self {
        self.sub_dir = Some(sub_dir.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn with_clear_env(mut self) -> Self {
        self.clear_env = true;
        self
    }

    /// Program name, if any arguments were given.
    pub fn program(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }
}

/// A single command with its own standard streams.
#[derive(Debug, Default)]
pub struct Cmd {
    pub args: Vec<String>,
    pub sub_dir: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    pub clear_env: bool,
    pub stdin: Input,
    pub stdout: Output,
    pub stderr: Output,
}

impl Cmd {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_sub_dir(mut self, sub_dir: impl Into<PathBuf>) -> Self {
        self.sub_dir = Some(sub_dir.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn with_clear_env(mut self) -> Self {
        self.clear_env = true;
        self
    }

    pub fn with_stdin(mut self, stdin: Input) -> Self {
        self.stdin = stdin;
        self
    }

    pub fn with_stdout(mut self, stdout: impl Into<Output>) -> Self {
        self.stdout = stdout.into();
        self
    }

    pub fn with_stderr(mut self, stderr: impl Into<Output>) -> Self {
        self.stderr = stderr.into();
        self
    }

    /// Splits the command into its process description and its streams.
    pub fn into_parts(self) -> (PipeCmd, Input, Output, Output) {
        let spec = PipeCmd {
            args: self.args,
            sub_dir: self.sub_dir,
            env: self.env,
            clear_env: self.clear_env,
        };
        (spec, self.stdin, self.stdout, self.stderr)
    }
}

/// Commands chained stdout-to-stdin, sharing one stdin, stdout and stderr.
#[derive(Debug, Default)]
pub struct PipeCmdList {
    pub cmds: Vec<PipeCmd>,
    /// Standard input of the first stage.
    pub stdin: Input,
    /// Standard output of the last stage.
    pub stdout: Output,
    /// Standard error of every stage.
    pub stderr: Output,
}

impl PipeCmdList {
    pub fn new(cmds: impl IntoIterator<Item = PipeCmd>) -> Self {
        Self {
            cmds: cmds.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn with_stdin(mut self, stdin: Input) -> Self {
        self.stdin = stdin;
        self
    }

    pub fn with_stdout(mut self, stdout: impl Into<Output>) -> Self {
        self.stdout = stdout.into();
        self
    }

    pub fn with_stderr(mut self, stderr: impl Into<Output>) -> Self {
        self.stderr = stderr.into();
        self
    }
}
