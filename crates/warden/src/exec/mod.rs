//! Process execution rooted in a directory.
//!
//! A single command is run as a one-stage pipeline: both paths share the
//! spawn and wait machinery, only validation differs.

mod stdio;
mod wait;

pub use wait::Wait;

use std::ffi::OsString;
use std::path::Path;
use std::process::{Command, Stdio};
use stdio::{Sink, Source};
use wait::{Running, Stage};
use warden_core::path::validate_relative;
use warden_core::{Cmd, Error, Guard, Input, Output, PipeCmd, PipeCmdList, Result};

/// Starts `cmd` in `dir` as one admitted operation on `guard`.
pub(crate) fn execute(guard: &Guard, dir: &Path, cmd: Cmd) -> Wait {
    let (spec, stdin, stdout, stderr) = cmd.into_parts();
    if let Err(e) = validate(&spec) {
        return Wait::failed(e);
    }
    let stages = vec![spec];
    match guard.run(|| spawn(dir, &stages, stdin, stdout, stderr)) {
        Ok(running) => Wait::running(running),
        Err(e) => Wait::failed(e),
    }
}

/// Starts every stage of `list` in `dir` as one admitted operation on
/// `guard`, stage `i`'s stdout feeding stage `i + 1`'s stdin.
pub(crate) fn execute_piped(guard: &Guard, dir: &Path, list: PipeCmdList) -> Wait {
    let PipeCmdList {
        cmds,
        stdin,
        stdout,
        stderr,
    } = list;
    if cmds.len() < 2 {
        return Wait::failed(Error::NotMultipleCommands);
    }
    if let Err(e) = cmds.iter().try_for_each(validate) {
        return Wait::failed(e);
    }
    match guard.run(|| spawn(dir, &cmds, stdin, stdout, stderr)) {
        Ok(running) => Wait::running(running),
        Err(e) => Wait::failed(e),
    }
}

fn validate(spec: &PipeCmd) -> Result<()> {
    if spec.args.is_empty() {
        return Err(Error::EmptyArguments);
    }
    if let Some(sub_dir) = &spec.sub_dir {
        validate_relative(sub_dir)?;
    }
    Ok(())
}

fn spawn(
    dir: &Path,
    specs: &[PipeCmd],
    stdin: Input,
    stdout: Output,
    stderr: Output,
) -> Result<Running> {
    let stdout = Sink::open(stdout)?;
    let stderr = Sink::open(stderr)?;
    let (first_stdin, source) = Source::open(stdin);

    let links = specs.len().saturating_sub(1);
    let mut readers = Vec::with_capacity(links);
    let mut writers = Vec::with_capacity(links);
    for _ in 0..links {
        let (read, write) = stdio::pipe()?;
        readers.push(Some(read));
        writers.push(Some(write));
    }

    let mut running = Running {
        stages: Vec::with_capacity(specs.len()),
        readers,
        writers,
        feeder: Default::default(),
        stdout,
        stderr,
    };
    let mut first_stdin = Some(first_stdin);
    let mut source = Some(source);

    for (i, spec) in specs.iter().enumerate() {
        match start_stage(dir, spec, i, &running, &mut first_stdin) {
            Ok(stage) => running.stages.push(stage),
            Err(e) => return Err(abort(running, e)),
        }
        // Stage i holds its own copy of the read end now. Once it exits,
        // stage i - 1 must see a broken pipe instead of a full one.
        if i > 0 {
            if let Err(e) = stdio::close(running.readers[i - 1].take()) {
                return Err(abort(running, e));
            }
        }
        if let Some(source) = source.take() {
            match source.start(&mut running.stages[0].child) {
                Ok(feeder) => running.feeder = feeder,
                Err(e) => return Err(abort(running, e)),
            }
        }
    }
    Ok(running)
}

fn abort(running: Running, error: Error) -> Error {
    tracing::debug!("pipeline failed to start: {}", error);
    running.abort();
    error
}

fn start_stage(
    dir: &Path,
    spec: &PipeCmd,
    i: usize,
    running: &Running,
    first_stdin: &mut Option<Stdio>,
) -> Result<Stage> {
    let last = i == running.readers.len();

    let stdin = match first_stdin.take() {
        Some(stdin) => stdin,
        None => match &running.readers[i - 1] {
            Some(read) => Stdio::from(read.try_clone()?),
            None => Stdio::null(),
        },
    };
    let stdout = if last {
        running.stdout.stdio()?
    } else {
        match &running.writers[i] {
            Some(write) => Stdio::from(write.try_clone()?),
            None => Stdio::null(),
        }
    };

    let mut command = command(dir, spec)?;
    command
        .stdin(stdin)
        .stdout(stdout)
        .stderr(running.stderr.stdio()?);

    // The command owns the child's copies of the pipe ends. It is dropped
    // on return so that only the parent's copies remain open.
    let program = spec.program().unwrap_or_default().to_string();
    let child = command.spawn().map_err(|source| Error::Spawn {
        program: program.clone(),
        source,
    })?;
    tracing::debug!(program = %program, pid = child.id(), stage = i, "spawned process");
    Ok(Stage { program, child })
}

fn command(dir: &Path, spec: &PipeCmd) -> Result<Command> {
    let (program, args) = spec.args.split_first().ok_or(Error::EmptyArguments)?;
    let cwd = match &spec.sub_dir {
        Some(sub_dir) => dir.join(sub_dir),
        None => dir.to_path_buf(),
    };
    ensure_program(program, spec, &cwd)?;

    let mut command = Command::new(program);
    command.args(args).current_dir(&cwd);
    if spec.clear_env {
        command.env_clear();
    }
    command.envs(spec.env.iter().map(|(key, value)| (key, value)));
    Ok(command)
}

/// Reports a program missing from the `PATH` the child will search.
fn ensure_program(program: &str, spec: &PipeCmd, cwd: &Path) -> Result<()> {
    if program.contains('/') {
        return Ok(());
    }
    let path: Option<OsString> = match spec.env.iter().rev().find(|(key, _)| key == "PATH") {
        Some((_, value)) => Some(value.into()),
        None if spec.clear_env => None,
        None => std::env::var_os("PATH"),
    };
    let Some(path) = path else {
        return Ok(());
    };
    which::which_in(program, Some(path), cwd)
        .map(drop)
        .map_err(|_| Error::ProgramNotFound(program.to_string()))
}
