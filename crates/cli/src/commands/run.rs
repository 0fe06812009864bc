//! The `run` command - runs one command in a sandbox directory.

use super::{ProviderArgs, with_sandbox};
use anyhow::Context;
use clap::Args;
use std::fs::File;
use std::path::{Path, PathBuf};
use warden::{Client, Cmd, Input, Output};

#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    provider: ProviderArgs,

    /// Copy a host file into the sandbox before running (repeatable)
    #[arg(long, short, value_parser = parse_existing_file)]
    file: Vec<PathBuf>,

    /// Command and arguments to run
    #[arg(last = true, required = true)]
    argv: Vec<String>,
}

pub fn run(args: RunArgs) -> anyhow::Result<()> {
    with_sandbox(&args.provider, |client| {
        for file in &args.file {
            copy_in(client, file)?;
        }
        client
            .execute(
                Cmd::new(args.argv.iter().cloned())
                    .with_stdin(Input::Inherit)
                    .with_stdout(Output::Inherit)
                    .with_stderr(Output::Inherit),
            )
            .wait()?;
        Ok(())
    })
}

/// Copies `source` into the root of the sandbox under its file name.
pub(super) fn copy_in(client: &Client, source: &Path) -> anyhow::Result<()> {
    let name = source
        .file_name()
        .with_context(|| format!("no file name in {}", source.display()))?;
    let mut reader =
        File::open(source).with_context(|| format!("failed to open {}", source.display()))?;
    let mut writer = client.create(name)?;
    std::io::copy(&mut reader, &mut writer)
        .with_context(|| format!("failed to copy {}", source.display()))?;
    tracing::debug!(file = %source.display(), "copied file into sandbox");
    Ok(())
}

pub(super) fn parse_existing_file(s: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(s);
    if !path.exists() {
        return Err(format!("file not found: {s}"));
    }
    if !path.is_file() {
        return Err(format!("not a file: {s}"));
    }
    Ok(path)
}
