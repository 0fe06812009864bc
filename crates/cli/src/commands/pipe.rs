//! The `pipe` command - runs a pipeline of commands in a sandbox directory.

use super::run::{copy_in, parse_existing_file};
use super::{ProviderArgs, with_sandbox};
use anyhow::Context;
use clap::Args;
use std::fs::File;
use std::path::PathBuf;
use warden::{Input, Output, PipeCmd, PipeCmdList};

#[derive(Args)]
pub struct PipeArgs {
    #[command(flatten)]
    provider: ProviderArgs,

    /// Copy a host file into the sandbox before running (repeatable)
    #[arg(long, short, value_parser = parse_existing_file)]
    file: Vec<PathBuf>,

    /// File fed to the first stage instead of standard input
    #[arg(long, short)]
    input: Option<PathBuf>,

    /// Pipeline stages, each one quoted command line
    #[arg(required = true, num_args = 2.., value_parser = parse_stage)]
    stages: Vec<PipeCmd>,
}

pub fn run(args: PipeArgs) -> anyhow::Result<()> {
    let stdin = match &args.input {
        Some(path) => Input::File(
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?,
        ),
        None => Input::Inherit,
    };

    with_sandbox(&args.provider, |client| {
        for file in &args.file {
            copy_in(client, file)?;
        }
        client
            .execute_piped(
                PipeCmdList::new(args.stages.iter().cloned())
                    .with_stdin(stdin)
                    .with_stdout(Output::Inherit)
                    .with_stderr(Output::Inherit),
            )
            .wait()?;
        Ok(())
    })
}

fn parse_stage(s: &str) -> Result<PipeCmd, String> {
    let words = shlex::split(s).ok_or_else(|| format!("unbalanced quotes in '{s}'"))?;
    if words.is_empty() {
        return Err("stage cannot be empty".to_string());
    }
    Ok(PipeCmd::new(words))
}
