mod commands;

use clap::{Parser, Subcommand};
use commands::{pipe::PipeArgs, run::RunArgs};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "warden")]
#[command(about = "Run commands inside disposable sandbox directories")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one command in a fresh temporary directory
    Run(RunArgs),

    /// Run a pipeline of commands in a fresh temporary directory
    Pipe(PipeArgs),

    /// List the supported executor types
    Types,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Pipe(args) => commands::pipe::run(args),
        Commands::Types => {
            commands::types::run();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:?}");
        std::process::exit(commands::exit_code(&e));
    }
}
